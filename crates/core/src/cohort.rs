//! The two register/tracked-table pairs reconciled by a sync.

use crate::constants::{
    DEFAULT_DIABETES_WORKSHEET, DEFAULT_ID_COLUMN, DEFAULT_SMI_WORKSHEET, DIABETES_FILENAME,
    SMI_FILENAME,
};
use crate::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cohort {
    /// Diabetes register.
    Diabetes,
    /// Severe mental illness register.
    Smi,
}

impl Cohort {
    pub const ALL: [Cohort; 2] = [Cohort::Diabetes, Cohort::Smi];

    /// Lowercase form used in URLs, CLI arguments and config files.
    pub fn slug(self) -> &'static str {
        match self {
            Cohort::Diabetes => "diabetes",
            Cohort::Smi => "smi",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cohort::Diabetes => "Diabetes",
            Cohort::Smi => "SMI",
        }
    }

    pub fn default_worksheet(self) -> &'static str {
        match self {
            Cohort::Diabetes => DEFAULT_DIABETES_WORKSHEET,
            Cohort::Smi => DEFAULT_SMI_WORKSHEET,
        }
    }

    pub fn default_filename(self) -> &'static str {
        match self {
            Cohort::Diabetes => DIABETES_FILENAME,
            Cohort::Smi => SMI_FILENAME,
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Cohort {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "diabetes" => Ok(Cohort::Diabetes),
            "smi" => Ok(Cohort::Smi),
            other => Err(SyncError::InvalidInput(format!(
                "unknown cohort '{other}' (expected 'diabetes' or 'smi')"
            ))),
        }
    }
}

/// Where a cohort's register and tracked table live, and how they are matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CohortConfig {
    pub cohort: Cohort,
    /// Worksheet (tab) name in the register spreadsheet.
    pub worksheet: String,
    /// Notion database holding the tracked patients.
    pub database_id: String,
    pub register_id_column: String,
    pub tracked_id_column: String,
    /// Download filename for the intervention list.
    pub filename: String,
}

impl CohortConfig {
    /// A cohort using the default worksheet, identifier column and filename.
    pub fn with_defaults(cohort: Cohort, database_id: impl Into<String>) -> Self {
        Self {
            cohort,
            worksheet: cohort.default_worksheet().to_owned(),
            database_id: database_id.into(),
            register_id_column: DEFAULT_ID_COLUMN.to_owned(),
            tracked_id_column: DEFAULT_ID_COLUMN.to_owned(),
            filename: cohort.default_filename().to_owned(),
        }
    }
}
