//! Register reconciliation.
//!
//! Runs the loader and calculator for each configured cohort. Cohorts are processed one after
//! another and any failure aborts the whole sync, so callers never see a partial outcome.

use crate::cohort::{Cohort, CohortConfig};
use crate::export::to_csv;
use crate::intervention::compute_intervention_keyed;
use crate::source::{RegisterSource, TrackedSource};
use crate::table::Table;
use crate::{SyncError, SyncResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Result of reconciling one cohort.
#[derive(Clone, Debug)]
pub struct CohortOutcome {
    pub cohort: Cohort,
    pub filename: String,
    pub register_rows: usize,
    pub tracked_rows: usize,
    pub interventions: Table,
    /// `interventions` rendered as CSV.
    pub csv: String,
}

/// Result of a full sync across every configured cohort.
#[derive(Clone, Debug)]
pub struct SyncOutcome {
    pub synced_at: DateTime<Utc>,
    pub cohorts: Vec<CohortOutcome>,
}

impl SyncOutcome {
    pub fn cohort(&self, cohort: Cohort) -> Option<&CohortOutcome> {
        self.cohorts.iter().find(|c| c.cohort == cohort)
    }
}

/// Loads registers and tracked tables and computes intervention lists.
#[derive(Clone)]
pub struct Reconciler {
    registers: Arc<dyn RegisterSource>,
    tracked: Arc<dyn TrackedSource>,
    cohorts: Vec<CohortConfig>,
}

impl Reconciler {
    pub fn new(
        registers: Arc<dyn RegisterSource>,
        tracked: Arc<dyn TrackedSource>,
        cohorts: Vec<CohortConfig>,
    ) -> Self {
        Self {
            registers,
            tracked,
            cohorts,
        }
    }

    pub fn cohorts(&self) -> &[CohortConfig] {
        &self.cohorts
    }

    fn cohort_config(&self, cohort: Cohort) -> SyncResult<&CohortConfig> {
        self.cohorts
            .iter()
            .find(|c| c.cohort == cohort)
            .ok_or_else(|| SyncError::InvalidInput(format!("cohort '{cohort}' is not configured")))
    }

    /// Fetches the projected tracked table for one cohort.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidInput` for an unconfigured cohort, or the source's error.
    pub async fn tracked_table(&self, cohort: Cohort) -> SyncResult<Table> {
        let cfg = self.cohort_config(cohort)?;
        self.tracked.fetch_tracked(&cfg.database_id).await
    }

    /// Reconciles a single cohort.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidInput` for an unconfigured cohort, a `SyncError::Source` if
    /// either read fails, or a data-shape error if an identifier column is missing.
    pub async fn reconcile(&self, cohort: Cohort) -> SyncResult<CohortOutcome> {
        let cfg = self.cohort_config(cohort)?;

        tracing::info!(cohort = %cohort, worksheet = %cfg.worksheet, "loading register");
        let register = self.registers.fetch_register(&cfg.worksheet).await?;

        tracing::info!(cohort = %cohort, "loading tracked table");
        let tracked = self.tracked.fetch_tracked(&cfg.database_id).await?;

        let interventions = compute_intervention_keyed(
            &register,
            &cfg.register_id_column,
            &tracked,
            &cfg.tracked_id_column,
        )?;
        let csv = to_csv(&interventions)?;

        tracing::info!(
            cohort = %cohort,
            register_rows = register.len(),
            tracked_rows = tracked.len(),
            interventions = interventions.len(),
            "reconciled cohort"
        );

        Ok(CohortOutcome {
            cohort,
            filename: cfg.filename.clone(),
            register_rows: register.len(),
            tracked_rows: tracked.len(),
            interventions,
            csv,
        })
    }

    /// Reconciles every configured cohort in order.
    ///
    /// # Errors
    ///
    /// Returns the first cohort's error; no partial outcome is produced.
    pub async fn sync(&self) -> SyncResult<SyncOutcome> {
        let mut cohorts = Vec::with_capacity(self.cohorts.len());
        for cfg in &self.cohorts {
            match self.reconcile(cfg.cohort).await {
                Ok(outcome) => cohorts.push(outcome),
                Err(e) => {
                    tracing::error!(cohort = %cfg.cohort, "sync aborted: {}", e);
                    return Err(e);
                }
            }
        }

        Ok(SyncOutcome {
            synced_at: Utc::now(),
            cohorts,
        })
    }
}
