//! Response validation and JSON decoding.

use serde::de::DeserializeOwned;

use crate::error::UploadError;
use crate::types::{Decoded, ResponseContext};

/// Field the upload base URL is merged into on a decoded upload result.
pub const UPLOAD_URL_FIELD: &str = "uploadURL";

/// Passes the context through when its status is 2xx.
pub fn validate(ctx: ResponseContext) -> Result<ResponseContext, UploadError> {
    let status = ctx.response.status;
    if (200..300).contains(&status) {
        return Ok(ctx);
    }

    Err(UploadError::ResponseStatus {
        status,
        status_text: ctx.response.status_text.clone(),
        response: ctx.response,
    })
}

/// Parses the response body as JSON, keeping the upload URL paired with it.
pub fn decode<T: DeserializeOwned>(ctx: ResponseContext) -> Result<Decoded<T>, UploadError> {
    match serde_json::from_str(&ctx.response.text) {
        Ok(body) => Ok(Decoded {
            body,
            upload_url: ctx.upload_url,
        }),
        Err(source) => Err(UploadError::ResponseDecode {
            source,
            response: ctx.response,
        }),
    }
}

/// Folds the paired upload URL into a decoded object body.
///
/// Non-object bodies are returned unchanged.
pub fn merge_upload_url(decoded: Decoded<serde_json::Value>) -> serde_json::Value {
    let Decoded {
        mut body,
        upload_url,
    } = decoded;

    if let (Some(url), Some(map)) = (upload_url, body.as_object_mut()) {
        map.insert(UPLOAD_URL_FIELD.into(), serde_json::Value::String(url));
    }
    body
}
