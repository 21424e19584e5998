//! Read-only Google Sheets values client.

use crate::values::{register_table, ValueRangeWire};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use sync_core::{RegisterSource, SheetsCredential, SourceFuture, SyncError, SyncResult, Table};

/// Public Sheets API root.
pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

const SOURCE_NAME: &str = "Sheets";

#[derive(Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    credential: SheetsCredential,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("base_url", &self.base_url)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    /// Creates a client for one spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the HTTP client cannot be built.
    pub fn new(
        spreadsheet_id: impl Into<String>,
        credential: SheetsCredential,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build Sheets HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            spreadsheet_id: spreadsheet_id.into(),
            credential,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// URL of the values endpoint for a whole worksheet.
    fn values_url(&self, worksheet: &str) -> SyncResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SyncError::Config(format!("invalid Sheets base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SyncError::Config("Sheets base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend([
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                &sheet_range(worksheet),
            ]);
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "FORMATTED_VALUE")
            .append_pair("majorDimension", "ROWS");
        Ok(url)
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            SheetsCredential::ApiKey(key) => request.query(&[("key", key.as_str())]),
            SheetsCredential::AccessToken(token) => request.bearer_auth(token),
        }
    }

    /// Reads every populated cell of a worksheet.
    ///
    /// # Errors
    ///
    /// Returns a `SyncError::Source` for transport failures, non-success statuses or an
    /// unparseable body.
    pub async fn read_values(&self, worksheet: &str) -> SyncResult<ValueRangeWire> {
        let url = self.values_url(worksheet)?;
        send_json(self.authorised(self.http.get(url))).await
    }

    /// Fetches a worksheet as a register table.
    ///
    /// # Errors
    ///
    /// Returns a `SyncError::Source` if the worksheet cannot be read, or a data-shape error if
    /// it has no header row or a row wider than the header.
    pub async fn register_table(&self, worksheet: &str) -> SyncResult<Table> {
        let wire = self.read_values(worksheet).await?;
        let table = register_table(worksheet, &wire)?;
        tracing::info!(
            worksheet,
            range = %wire.range,
            rows = table.len(),
            "fetched register worksheet"
        );
        Ok(table)
    }
}

impl RegisterSource for SheetsClient {
    fn fetch_register<'a>(&'a self, worksheet: &'a str) -> SourceFuture<'a, Table> {
        Box::pin(self.register_table(worksheet))
    }
}

/// A1 range covering a whole worksheet: the quoted sheet name with embedded quotes doubled.
pub fn sheet_range(worksheet: &str) -> String {
    format!("'{}'", worksheet.replace('\'', "''"))
}

/// Google API error envelope (`{"error": {"code": ..., "message": ..., "status": ...}}`).
#[derive(serde::Deserialize)]
struct ErrorEnvelopeWire {
    error: ErrorWire,
}

#[derive(serde::Deserialize)]
struct ErrorWire {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> SyncResult<T> {
    source_http::send_json(SOURCE_NAME, request, error_message).await
}

fn error_message(body: &str) -> Option<String> {
    let e = serde_json::from_str::<ErrorEnvelopeWire>(body).ok()?.error;
    (!e.message.is_empty()).then(|| format!("{}: {}", e.status, e.message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::get,
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use sync_core::{Scalar, SourceError};

    const API_KEY: &str = "good-key";
    const ACCESS_TOKEN: &str = "good-token";

    /// One request seen by the stub: the decoded range and the query parameters.
    type Seen = (String, HashMap<String, String>);

    /// Local stand-in for the Sheets values API.
    #[derive(Clone, Default)]
    struct Stub {
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    fn google_error(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
        (
            status,
            Json(json!({
                "error": {"code": status.as_u16(), "message": message, "status": code}
            })),
        )
    }

    async fn values(
        State(stub): State<Stub>,
        Path((_spreadsheet_id, range)): Path<(String, String)>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        stub.seen.lock().unwrap().push((range.clone(), query.clone()));

        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match (query.get("key").map(String::as_str), bearer) {
            (Some(API_KEY), _) | (None, Some(ACCESS_TOKEN)) => {}
            (Some(_), _) => {
                return google_error(
                    StatusCode::FORBIDDEN,
                    "PERMISSION_DENIED",
                    "The caller does not have permission",
                )
            }
            (None, _) => {
                return google_error(
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHENTICATED",
                    "Request had invalid authentication credentials.",
                )
            }
        }

        if range == "'Missing'" {
            return google_error(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                "Unable to parse range: 'Missing'",
            );
        }

        (
            StatusCode::OK,
            Json(json!({
                "range": format!("{range}!A1:Z1000"),
                "majorDimension": "ROWS",
                "values": [["NHS number", "Name"], ["943 476 5919", "Jane Doe"], ["222", "B"]]
            })),
        )
    }

    async fn serve(stub: &Stub) -> String {
        let app = Router::new()
            .route("/v4/spreadsheets/:id/values/:range", get(values))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v4")
    }

    fn client(credential: SheetsCredential) -> SheetsClient {
        SheetsClient::new("sheet-123", credential, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn api_key_reads_a_worksheet() {
        let stub = Stub::default();
        let table = client(SheetsCredential::ApiKey(API_KEY.into()))
            .with_base_url(serve(&stub).await)
            .register_table("SMI register")
            .await
            .expect("register");

        assert_eq!(table.name(), "SMI register");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].cells()[0], Scalar::text("943 476 5919"));

        let seen = stub.seen.lock().unwrap().clone();
        let (range, query) = &seen[0];
        assert_eq!(range, "'SMI register'");
        assert_eq!(query.get("key").map(String::as_str), Some(API_KEY));
        assert_eq!(
            query.get("valueRenderOption").map(String::as_str),
            Some("FORMATTED_VALUE")
        );
        assert_eq!(query.get("majorDimension").map(String::as_str), Some("ROWS"));
    }

    #[tokio::test]
    async fn access_token_is_sent_as_bearer() {
        let stub = Stub::default();
        client(SheetsCredential::AccessToken(ACCESS_TOKEN.into()))
            .with_base_url(serve(&stub).await)
            .register_table("Diabetes")
            .await
            .expect("register");

        let seen = stub.seen.lock().unwrap().clone();
        assert!(!seen[0].1.contains_key("key"));
    }

    #[tokio::test]
    async fn rejected_credentials_are_unauthorised() {
        let stub = Stub::default();
        let base = serve(&stub).await;

        let err = client(SheetsCredential::ApiKey("bad-key".into()))
            .with_base_url(base.clone())
            .register_table("Diabetes")
            .await
            .expect_err("403");
        match &err {
            SyncError::Source(SourceError::Unauthorised { message, .. }) => {
                assert_eq!(message, "PERMISSION_DENIED: The caller does not have permission");
            }
            other => panic!("expected Unauthorised, got {other:?}"),
        }
        assert!(!err.to_string().contains("bad-key"));

        let err = client(SheetsCredential::AccessToken("expired".into()))
            .with_base_url(base)
            .register_table("Diabetes")
            .await
            .expect_err("401");
        assert!(matches!(
            err,
            SyncError::Source(SourceError::Unauthorised { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_worksheet_is_not_found() {
        let stub = Stub::default();
        let err = client(SheetsCredential::ApiKey(API_KEY.into()))
            .with_base_url(serve(&stub).await)
            .register_table("Missing")
            .await
            .expect_err("400");
        assert!(matches!(
            err,
            SyncError::Source(SourceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_api_does_not_leak_the_key() {
        let err = client(SheetsCredential::ApiKey("SUPERSECRETKEY".into()))
            .with_base_url("http://127.0.0.1:1/v4")
            .register_table("Diabetes")
            .await
            .expect_err("nothing listens on port 1");

        assert!(matches!(
            err,
            SyncError::Source(SourceError::Unavailable { .. })
        ));
        let msg = err.to_string();
        assert!(!msg.contains("SUPERSECRETKEY"), "{msg}");
        assert!(!format!("{err:?}").contains("SUPERSECRETKEY"));
    }

    #[test]
    fn sheet_range_quotes_and_escapes() {
        assert_eq!(sheet_range("Diabetes"), "'Diabetes'");
        assert_eq!(sheet_range("Pat's list"), "'Pat''s list'");
    }

    #[test]
    fn values_url_percent_encodes_the_range() {
        let url = client(SheetsCredential::ApiKey("k".into()))
            .with_base_url("http://localhost:8080/v4/")
            .values_url("SMI register")
            .expect("url");

        assert_eq!(
            url.path(),
            "/v4/spreadsheets/sheet-123/values/'SMI%20register'"
        );
    }

    #[test]
    fn worksheet_names_cannot_escape_the_path() {
        let url = client(SheetsCredential::ApiKey("k".into()))
            .values_url("a/../b?x")
            .expect("url");
        assert!(url.path().ends_with("/values/'a%2F..%2Fb%3Fx'"), "{}", url.path());
        assert!(url.query_pairs().all(|(k, _)| k != "x"));
    }

    #[test]
    fn error_message_reads_google_envelope() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("PERMISSION_DENIED: The caller does not have permission")
        );
        assert_eq!(error_message("oops"), None);
    }

    #[test]
    fn debug_hides_credentials() {
        let debug = format!("{:?}", client(SheetsCredential::AccessToken("ya29.secret".into())));
        assert!(!debug.contains("ya29.secret"));
        assert!(debug.contains("sheet-123"));
    }
}
