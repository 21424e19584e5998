//! Read-only Notion API client.

use crate::database::{project_pages, DatabaseWire, PageWire, QueryResponseWire};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use sync_core::{SourceError, SourceFuture, SyncError, SyncResult, Table, TrackedSource};

/// Public Notion API root.
pub const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";

/// API version pinned for every request.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Largest page size the query endpoint accepts.
const PAGE_SIZE: u32 = 100;

const SOURCE_NAME: &str = "Notion";

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl NotionClient {
    /// Creates a client authenticating with an integration token.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the HTTP client cannot be built.
    pub fn new(token: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build Notion HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: token.into(),
        })
    }

    /// Points the client at a different API root (e.g. a local stub).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Retrieves a database's schema.
    ///
    /// # Errors
    ///
    /// Returns a `SyncError::Source` for transport failures, non-success statuses or an
    /// unparseable body.
    pub async fn retrieve_database(&self, database_id: &str) -> SyncResult<DatabaseWire> {
        let url = format!("{}/databases/{}", self.base_url, database_id);
        send_json(self.authorised(self.http.get(url))).await
    }

    /// Queries every page of a database, following `next_cursor` until `has_more` is false.
    ///
    /// # Errors
    ///
    /// Returns a `SyncError::Source` if any page request fails, or if the API reports more
    /// results without supplying a cursor.
    pub async fn query_all(&self, database_id: &str) -> SyncResult<Vec<PageWire>> {
        let url = format!("{}/databases/{}/query", self.base_url, database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": PAGE_SIZE });
            if let Some(c) = &cursor {
                body["start_cursor"] = json!(c);
            }

            let response: QueryResponseWire =
                send_json(self.authorised(self.http.post(&url)).json(&body)).await?;
            tracing::debug!(
                database_id,
                fetched = response.results.len(),
                has_more = response.has_more,
                "queried Notion page"
            );
            pages.extend(response.results);

            match (response.has_more, response.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                (true, None) => {
                    return Err(SourceError::Malformed {
                        source_name: SOURCE_NAME,
                        message: "has_more is true but next_cursor is missing".into(),
                    }
                    .into())
                }
                (false, _) => break,
            }
        }

        Ok(pages)
    }

    /// Fetches and projects a whole database into a tracked table.
    ///
    /// # Errors
    ///
    /// Returns a `SyncError::Source` if the schema or any query page cannot be read.
    pub async fn tracked_table(&self, database_id: &str) -> SyncResult<Table> {
        let schema = self.retrieve_database(database_id).await?;
        let pages = self.query_all(database_id).await?;
        tracing::info!(database_id, pages = pages.len(), "fetched Notion database");
        project_pages(&schema, &pages)
    }
}

impl TrackedSource for NotionClient {
    fn fetch_tracked<'a>(&'a self, database_id: &'a str) -> SourceFuture<'a, Table> {
        Box::pin(self.tracked_table(database_id))
    }
}

/// Error body returned by the API (`{"object": "error", "code": ..., "message": ...}`).
#[derive(serde::Deserialize)]
struct ErrorWire {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> SyncResult<T> {
    source_http::send_json(SOURCE_NAME, request, error_message).await
}

fn error_message(body: &str) -> Option<String> {
    let e = serde_json::from_str::<ErrorWire>(body).ok()?;
    (!e.message.is_empty()).then(|| format!("{}: {}", e.code, e.message))
}
