//! Constants used throughout the sync core crate.
//!
//! Environment variable names and defaults live here so the binaries, the config loader and the
//! tests agree on them.

/// Default identifier column in both registers and tracked tables.
pub const DEFAULT_ID_COLUMN: &str = "NHS number";

/// Default worksheet holding the diabetes register.
pub const DEFAULT_DIABETES_WORKSHEET: &str = "Diabetes";

/// Default worksheet holding the SMI register.
pub const DEFAULT_SMI_WORKSHEET: &str = "SMI";

/// Fixed download filename for the diabetes intervention list.
pub const DIABETES_FILENAME: &str = "diabetes_interventions.csv";

/// Fixed download filename for the SMI intervention list.
pub const SMI_FILENAME: &str = "smi_interventions.csv";

/// Default timeout applied to each external HTTP request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default lifetime of a passcode session (20 minutes).
pub const DEFAULT_SESSION_TTL_SECS: u64 = 20 * 60;

/// Default REST listen address.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

pub const ENV_SPREADSHEET_ID: &str = "REGISTER_SPREADSHEET_ID";
pub const ENV_SHEETS_API_KEY: &str = "GOOGLE_SHEETS_API_KEY";
pub const ENV_SHEETS_ACCESS_TOKEN: &str = "GOOGLE_SHEETS_ACCESS_TOKEN";
pub const ENV_NOTION_TOKEN: &str = "NOTION_TOKEN";
pub const ENV_PASSCODE: &str = "SYNC_PASSCODE";
pub const ENV_DIABETES_WORKSHEET: &str = "DIABETES_WORKSHEET";
pub const ENV_SMI_WORKSHEET: &str = "SMI_WORKSHEET";
pub const ENV_DIABETES_DATABASE_ID: &str = "DIABETES_DATABASE_ID";
pub const ENV_SMI_DATABASE_ID: &str = "SMI_DATABASE_ID";
pub const ENV_REGISTER_ID_COLUMN: &str = "REGISTER_ID_COLUMN";
pub const ENV_TRACKED_ID_COLUMN: &str = "TRACKED_ID_COLUMN";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "SYNC_HTTP_TIMEOUT_SECS";
pub const ENV_SESSION_TTL_SECS: &str = "SYNC_SESSION_TTL_SECS";
pub const ENV_REST_ADDR: &str = "SYNC_REST_ADDR";
pub const ENV_COHORTS_FILE: &str = "REGISTER_SYNC_COHORTS_FILE";
