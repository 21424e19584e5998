//! Runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the sources and the
//! reconciler; nothing reads process-wide environment variables during a sync. Resolution goes
//! through a key lookup closure so tests can supply values without mutating the environment.

use crate::cohort::{Cohort, CohortConfig};
use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_ID_COLUMN, DEFAULT_REST_ADDR, DEFAULT_SESSION_TTL_SECS,
    ENV_COHORTS_FILE, ENV_DIABETES_DATABASE_ID, ENV_DIABETES_WORKSHEET, ENV_HTTP_TIMEOUT_SECS,
    ENV_NOTION_TOKEN, ENV_PASSCODE, ENV_REGISTER_ID_COLUMN, ENV_REST_ADDR,
    ENV_SESSION_TTL_SECS, ENV_SHEETS_ACCESS_TOKEN, ENV_SHEETS_API_KEY, ENV_SMI_DATABASE_ID,
    ENV_SMI_WORKSHEET, ENV_SPREADSHEET_ID, ENV_TRACKED_ID_COLUMN,
};
use crate::validation::{require_non_empty, validate_download_filename};
use crate::{SyncError, SyncResult};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// How requests to the spreadsheet API are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum SheetsCredential {
    /// `key=` query parameter; enough for link-shared spreadsheets.
    ApiKey(String),
    /// OAuth bearer token, typically minted for a service account.
    AccessToken(String),
}

impl fmt::Debug for SheetsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetsCredential::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            SheetsCredential::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// Sync configuration resolved at startup.
#[derive(Clone)]
pub struct SyncConfig {
    spreadsheet_id: String,
    sheets_credential: SheetsCredential,
    notion_token: String,
    passcode: Option<String>,
    cohorts: Vec<CohortConfig>,
    http_timeout: Duration,
    session_ttl: Duration,
    rest_addr: String,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheets_credential", &self.sheets_credential)
            .field("notion_token", &"<redacted>")
            .field("passcode", &self.passcode.as_ref().map(|_| "<redacted>"))
            .field("cohorts", &self.cohorts)
            .field("http_timeout", &self.http_timeout)
            .field("session_ttl", &self.session_ttl)
            .field("rest_addr", &self.rest_addr)
            .finish()
    }
}

impl SyncConfig {
    /// Create a new `SyncConfig` with default timeouts and listen address.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if a required value is empty, a cohort is listed twice, or a
    /// download filename is unsafe.
    pub fn new(
        spreadsheet_id: String,
        sheets_credential: SheetsCredential,
        notion_token: String,
        cohorts: Vec<CohortConfig>,
    ) -> SyncResult<Self> {
        let spreadsheet_id = require_non_empty("spreadsheet id", &spreadsheet_id)?;
        let notion_token = require_non_empty("Notion token", &notion_token)?;
        let sheets_credential = match sheets_credential {
            SheetsCredential::ApiKey(k) => {
                SheetsCredential::ApiKey(require_non_empty("Sheets API key", &k)?)
            }
            SheetsCredential::AccessToken(t) => {
                SheetsCredential::AccessToken(require_non_empty("Sheets access token", &t)?)
            }
        };
        validate_cohorts(&cohorts)?;

        Ok(Self {
            spreadsheet_id,
            sheets_credential,
            notion_token,
            passcode: None,
            cohorts,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            rest_addr: DEFAULT_REST_ADDR.to_owned(),
        })
    }

    /// Sets the passcode that gates the REST sync action.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if the passcode is empty.
    pub fn with_passcode(mut self, passcode: impl Into<String>) -> SyncResult<Self> {
        let passcode = passcode.into();
        if passcode.is_empty() {
            return Err(SyncError::Config("passcode cannot be empty".into()));
        }
        self.passcode = Some(passcode);
        Ok(self)
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_rest_addr(mut self, addr: impl Into<String>) -> Self {
        self.rest_addr = addr.into();
        self
    }

    /// Resolve configuration from a key lookup, typically `|k| std::env::var(k).ok()`.
    ///
    /// Cohorts come from the YAML file named by `REGISTER_SYNC_COHORTS_FILE` when set, otherwise
    /// from the per-cohort environment variables.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` if a required variable is missing or any value is invalid.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| SyncError::Config(format!("{key} must be set")))
        };

        let sheets_credential = match (get(ENV_SHEETS_ACCESS_TOKEN), get(ENV_SHEETS_API_KEY)) {
            (Some(token), _) => SheetsCredential::AccessToken(token),
            (None, Some(key)) => SheetsCredential::ApiKey(key),
            (None, None) => {
                return Err(SyncError::Config(format!(
                    "one of {ENV_SHEETS_ACCESS_TOKEN} or {ENV_SHEETS_API_KEY} must be set"
                )))
            }
        };

        let cohorts = match get(ENV_COHORTS_FILE) {
            Some(path) => cohorts_from_file(Path::new(&path))?,
            None => {
                let register_id = get(ENV_REGISTER_ID_COLUMN)
                    .unwrap_or_else(|| DEFAULT_ID_COLUMN.to_owned());
                let tracked_id =
                    get(ENV_TRACKED_ID_COLUMN).unwrap_or_else(|| DEFAULT_ID_COLUMN.to_owned());
                let env_cohort = |cohort: Cohort, worksheet_key: &str, database_key: &str| {
                    Ok::<_, SyncError>(CohortConfig {
                        cohort,
                        worksheet: get(worksheet_key)
                            .unwrap_or_else(|| cohort.default_worksheet().to_owned()),
                        database_id: required(database_key)?,
                        register_id_column: register_id.clone(),
                        tracked_id_column: tracked_id.clone(),
                        filename: cohort.default_filename().to_owned(),
                    })
                };
                vec![
                    env_cohort(
                        Cohort::Diabetes,
                        ENV_DIABETES_WORKSHEET,
                        ENV_DIABETES_DATABASE_ID,
                    )?,
                    env_cohort(Cohort::Smi, ENV_SMI_WORKSHEET, ENV_SMI_DATABASE_ID)?,
                ]
            }
        };

        let mut cfg = Self::new(
            required(ENV_SPREADSHEET_ID)?,
            sheets_credential,
            required(ENV_NOTION_TOKEN)?,
            cohorts,
        )?;

        if let Some(passcode) = get(ENV_PASSCODE) {
            cfg = cfg.with_passcode(passcode)?;
        }
        if let Some(secs) = get(ENV_HTTP_TIMEOUT_SECS) {
            let secs = parse_secs(ENV_HTTP_TIMEOUT_SECS, &secs)?;
            cfg = cfg.with_http_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = get(ENV_SESSION_TTL_SECS) {
            let secs = parse_secs(ENV_SESSION_TTL_SECS, &secs)?;
            cfg = cfg.with_session_ttl(Duration::from_secs(secs));
        }
        if let Some(addr) = get(ENV_REST_ADDR) {
            cfg = cfg.with_rest_addr(addr);
        }

        Ok(cfg)
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn sheets_credential(&self) -> &SheetsCredential {
        &self.sheets_credential
    }

    pub fn notion_token(&self) -> &str {
        &self.notion_token
    }

    pub fn passcode(&self) -> Option<&str> {
        self.passcode.as_deref()
    }

    pub fn cohorts(&self) -> &[CohortConfig] {
        &self.cohorts
    }

    pub fn cohort(&self, cohort: Cohort) -> Option<&CohortConfig> {
        self.cohorts.iter().find(|c| c.cohort == cohort)
    }

    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub fn rest_addr(&self) -> &str {
        &self.rest_addr
    }
}

fn parse_secs(key: &str, value: &str) -> SyncResult<u64> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(SyncError::Config(format!(
            "{key} must be a positive whole number of seconds, got '{value}'"
        ))),
    }
}

fn validate_cohorts(cohorts: &[CohortConfig]) -> SyncResult<()> {
    if cohorts.is_empty() {
        return Err(SyncError::Config("at least one cohort must be configured".into()));
    }

    let mut seen = HashSet::new();
    let mut filenames = HashSet::new();
    for c in cohorts {
        if !seen.insert(c.cohort) {
            return Err(SyncError::Config(format!(
                "cohort '{}' is configured more than once",
                c.cohort
            )));
        }
        require_non_empty(&format!("{} worksheet", c.cohort), &c.worksheet)?;
        require_non_empty(&format!("{} database id", c.cohort), &c.database_id)?;
        require_non_empty(&format!("{} register id column", c.cohort), &c.register_id_column)?;
        require_non_empty(&format!("{} tracked id column", c.cohort), &c.tracked_id_column)?;
        validate_download_filename(&c.filename)?;
        if !filenames.insert(c.filename.as_str()) {
            return Err(SyncError::Config(format!(
                "filename '{}' is used by more than one cohort",
                c.filename
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Cohorts file
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CohortsFileWire {
    cohorts: Vec<CohortWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CohortWire {
    cohort: Cohort,
    #[serde(default)]
    worksheet: Option<String>,
    database_id: String,
    #[serde(default)]
    register_id_column: Option<String>,
    #[serde(default)]
    tracked_id_column: Option<String>,
    #[serde(default)]
    filename: Option<String>,
}

/// Parse the cohort table from YAML text.
///
/// Unknown keys are rejected and the error names the failing path (e.g. `cohorts[0].cohort`).
///
/// # Errors
///
/// Returns `SyncError::Config` if the YAML does not match the schema.
pub fn cohorts_from_yaml(yaml_text: &str) -> SyncResult<Vec<CohortConfig>> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    let wire: CohortsFileWire = serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_owned()
        } else {
            path
        };
        SyncError::Config(format!("cohorts file mismatch at {path}: {}", err.into_inner()))
    })?;

    Ok(wire
        .cohorts
        .into_iter()
        .map(|c| {
            let defaults = CohortConfig::with_defaults(c.cohort, c.database_id);
            CohortConfig {
                worksheet: c.worksheet.unwrap_or_else(|| defaults.worksheet.clone()),
                register_id_column: c
                    .register_id_column
                    .unwrap_or_else(|| defaults.register_id_column.clone()),
                tracked_id_column: c
                    .tracked_id_column
                    .unwrap_or_else(|| defaults.tracked_id_column.clone()),
                filename: c.filename.unwrap_or_else(|| defaults.filename.clone()),
                ..defaults
            }
        })
        .collect())
}

fn cohorts_from_file(path: &Path) -> SyncResult<Vec<CohortConfig>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("failed to read cohorts file {}: {e}", path.display()))
    })?;
    cohorts_from_yaml(&text)
}
