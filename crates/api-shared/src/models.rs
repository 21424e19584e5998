//! Request and response bodies for the REST surface.

use serde::{Deserialize, Serialize};
use sync_core::{CohortOutcome, SyncOutcome};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct LoginReq {
    pub passcode: String,
}

impl std::fmt::Debug for LoginReq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoginReq { passcode: <redacted> }")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    /// Send back as the `x-session-id` header.
    pub session_id: String,
    /// RFC 3339 timestamp; refreshed by every authenticated request.
    pub expires_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CohortSummary {
    pub cohort: String,
    pub filename: String,
    pub register_rows: usize,
    pub tracked_rows: usize,
    pub interventions: usize,
    /// Path of the CSV download for this cohort.
    pub download: String,
}

impl From<&CohortOutcome> for CohortSummary {
    fn from(outcome: &CohortOutcome) -> Self {
        Self {
            cohort: outcome.cohort.slug().to_owned(),
            filename: outcome.filename.clone(),
            register_rows: outcome.register_rows,
            tracked_rows: outcome.tracked_rows,
            interventions: outcome.interventions.len(),
            download: format!("/downloads/{}", outcome.cohort.slug()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SyncRes {
    pub synced_at: String,
    pub cohorts: Vec<CohortSummary>,
}

impl From<&SyncOutcome> for SyncRes {
    fn from(outcome: &SyncOutcome) -> Self {
        Self {
            synced_at: outcome.synced_at.to_rfc3339(),
            cohorts: outcome.cohorts.iter().map(CohortSummary::from).collect(),
        }
    }
}
