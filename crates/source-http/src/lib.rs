//! Shared request plumbing for the source clients.
//!
//! Both the Sheets and Notion clients send a request, read the body, classify non-success
//! statuses onto [`SourceError`] and decode JSON with path-aware errors. Request URLs can carry
//! credentials (the Sheets `key=` parameter), so no error produced here ever includes one.

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use sync_core::{SourceError, SyncError, SyncResult};

/// Longest slice of an unparseable error body kept in a message.
const MAX_BODY_EXCERPT: usize = 200;

/// Extracts a readable message from a source's error body, or `None` if it is not recognised.
pub type ErrorBodyParser = fn(&str) -> Option<String>;

/// Sends a request and decodes a successful JSON body.
///
/// # Errors
///
/// Returns `SourceError::Unavailable` for transport failures, the status classification of
/// [`SourceError::from_status`] for non-success responses, and `SourceError::Malformed` if the
/// body does not match `T`.
pub async fn send_json<T: DeserializeOwned>(
    source_name: &'static str,
    request: RequestBuilder,
    parse_error: ErrorBodyParser,
) -> SyncResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(source_name, e))?;
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(source_name, e))?;

    if !status.is_success() {
        let message = parse_error(&body).unwrap_or_else(|| body_excerpt(&body));
        return Err(SourceError::from_status(source_name, status.as_u16(), message).into());
    }

    decode(source_name, &body)
}

/// Decodes a JSON body, naming the failing path on mismatch.
///
/// # Errors
///
/// Returns `SourceError::Malformed` with the path (e.g. `results[0].id`) and serde's message.
pub fn decode<T: DeserializeOwned>(source_name: &'static str, body: &str) -> SyncResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
        let path = err.path().to_string();
        SourceError::Malformed {
            source_name,
            message: format!("response mismatch at {path}: {}", err.into_inner()),
        }
        .into()
    })
}

/// Maps a reqwest failure onto `SourceError::Unavailable` with the request URL stripped.
pub fn transport_error(source_name: &'static str, err: reqwest::Error) -> SyncError {
    let timed_out = err.is_timeout();
    let err = err.without_url();
    let message = if timed_out {
        format!("request timed out: {err}")
    } else {
        err.to_string()
    };
    SourceError::Unavailable {
        source_name,
        message,
    }
    .into()
}

fn body_excerpt(body: &str) -> String {
    body.chars().take(MAX_BODY_EXCERPT).collect()
}
