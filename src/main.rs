use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use api_shared::{PasscodeGate, SessionStore};
use notion::NotionClient;
use sheets::SheetsClient;
use sync_core::{Reconciler, SyncConfig, constants::ENV_PASSCODE};

/// Main entry point for the register sync service
///
/// Resolves configuration once, wires the Google Sheets and Notion clients into a reconciler and
/// serves the REST API (with Swagger UI) until the process is stopped.
///
/// # Environment Variables
/// - `REGISTER_SPREADSHEET_ID`, `GOOGLE_SHEETS_API_KEY` or `GOOGLE_SHEETS_ACCESS_TOKEN`
/// - `NOTION_TOKEN`, `DIABETES_DATABASE_ID`, `SMI_DATABASE_ID`
/// - `SYNC_PASSCODE`: passcode required to open a session
/// - `SYNC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Errors
/// Returns an error if:
/// - configuration is missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("register_sync_run=info".parse()?)
                .add_directive("sync_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = SyncConfig::from_lookup(|key| std::env::var(key).ok())?;
    let Some(passcode) = cfg.passcode() else {
        anyhow::bail!("{ENV_PASSCODE} must be set to serve the REST API");
    };

    let sheets = SheetsClient::new(
        cfg.spreadsheet_id(),
        cfg.sheets_credential().clone(),
        cfg.http_timeout(),
    )?;
    let notion = NotionClient::new(cfg.notion_token(), cfg.http_timeout())?;
    let reconciler = Reconciler::new(Arc::new(sheets), Arc::new(notion), cfg.cohorts().to_vec());

    let state = AppState::new(
        reconciler,
        PasscodeGate::new(passcode),
        SessionStore::new(cfg.session_ttl()),
    );

    let addr = cfg.rest_addr();
    tracing::info!(
        cohorts = cfg.cohorts().len(),
        "++ Starting register sync REST on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
