//! direct-upload entry point.
//!
//! Presigns an upload, streams one file to the returned storage endpoint
//! and prints the decoded result. Ctrl-C cancels the transfer.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use direct_upload::{
    FileUploadTask, PresignDescriptor, ProgressCallback, ProgressEvent, UploadError, UploadFile,
    Uploader,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "direct-upload", version, about = "Upload a file through a presigned URL")]
struct Args {
    /// File to upload.
    file: PathBuf,

    /// Descriptor endpoint (overrides the config file).
    #[arg(long)]
    presign_url: Option<String>,

    /// Token sent on the presign request (overrides the config file).
    #[arg(long)]
    token: Option<String>,

    /// Identifier for this upload; random when omitted.
    #[arg(long)]
    uid: Option<String>,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(result) => {
            match serde_json::to_string_pretty(&result) {
                Ok(text) => println!("{text}"),
                Err(e) => warn!(error = %e, "failed to format result"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            match e.downcast_ref::<UploadError>() {
                Some(upload_err) => {
                    let report = upload_err.report();
                    error!(
                        stage = report.name,
                        message = %report.message,
                        cause = %report.error,
                        "upload failed"
                    );
                }
                None => error!(error = %format!("{e:#}"), "upload failed"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<serde_json::Value> {
    let config = config::CliConfig::load(args.config.as_deref())?;

    let presign_url = args
        .presign_url
        .or(config.presign_url)
        .context("no presign URL given (use --presign-url or set presign_url in the config)")?;
    let token = args.token.or(config.token);

    let content = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("file path has no file name")?;
    let uid = args
        .uid
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(
        version = env!("CARGO_PKG_VERSION"),
        file = %name,
        bytes = content.len(),
        uid = %uid,
        "starting upload"
    );

    let uploader = Uploader::http(config.uploader)?;

    let descriptor: PresignDescriptor = uploader.presign(&presign_url, token.as_deref()).await?;
    info!(url = %descriptor.url, uuid = %descriptor.uuid, "descriptor received");

    // Ctrl-C sends the uid to the cancel listener.
    let cancel_tx = uploader.cancel_channel(1);
    let ctrl_c = {
        let uid = uid.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!(uid = %uid, "interrupt received, cancelling upload");
                let _ = cancel_tx.send(uid).await;
            }
        })
    };

    let on_progress: ProgressCallback = Arc::new(|event: &ProgressEvent, file: &UploadFile| {
        info!(
            file = %file.name,
            loaded = event.loaded,
            total = event.total,
            percent = %format!("{:.1}", event.percent),
            "upload progress"
        );
    });

    let task = FileUploadTask::new(uid, UploadFile::new(name, content));
    let result = uploader.upload(descriptor, task, Some(on_progress)).await;
    ctrl_c.abort();

    Ok(result?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_args() {
        let args = Args::try_parse_from([
            "direct-upload",
            "photo.jpg",
            "--presign-url",
            "https://example.com/presign",
            "--token",
            "t",
            "--uid",
            "u1",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("photo.jpg"));
        assert_eq!(args.presign_url.as_deref(), Some("https://example.com/presign"));
        assert_eq!(args.token.as_deref(), Some("t"));
        assert_eq!(args.uid.as_deref(), Some("u1"));
        assert!(args.config.is_none());
    }

    #[test]
    fn file_is_required() {
        assert!(Args::try_parse_from(["direct-upload"]).is_err());
    }

    #[tokio::test]
    async fn run_without_presign_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();

        let args = Args {
            file,
            presign_url: None,
            token: None,
            uid: None,
            config: Some(dir.path().join("absent.toml")),
        };
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("presign URL"));
    }

    #[tokio::test]
    async fn run_with_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            file: dir.path().join("missing.bin"),
            presign_url: Some("http://127.0.0.1:9/presign".into()),
            token: None,
            uid: None,
            config: Some(dir.path().join("absent.toml")),
        };
        let err = run(args).await.unwrap_err();
        assert!(err.to_string().contains("missing.bin"));
    }
}
