use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sync_core::{
    compute_intervention_keyed, constants::DEFAULT_ID_COLUMN, read_csv, to_csv, CohortOutcome,
    Cohort, Reconciler, SyncConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notion::NotionClient;
use sheets::SheetsClient;

#[derive(Parser)]
#[command(name = "register-sync")]
#[command(about = "Reconcile patient registers against tracked Notion databases")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch registers and tracked tables and write intervention CSVs
    Sync {
        /// Directory to write the CSV files into (created if missing)
        #[arg(long)]
        out_dir: PathBuf,
        /// Only reconcile this cohort (diabetes or smi)
        #[arg(long)]
        cohort: Option<Cohort>,
    },
    /// Print a cohort's tracked table as CSV
    Tracked {
        /// Cohort whose Notion database to read (diabetes or smi)
        #[arg(long)]
        cohort: Cohort,
    },
    /// Compare two local CSV exports and print the intervention list
    Diff {
        /// Register CSV
        #[arg(long)]
        register: PathBuf,
        /// Tracked table CSV
        #[arg(long)]
        tracked: PathBuf,
        /// Identifier column in the register
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,
        /// Identifier column in the tracked table (defaults to --id-column)
        #[arg(long)]
        tracked_id_column: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("register_sync=info".parse()?)
                .add_directive("sync_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Sync { out_dir, cohort }) => {
            let reconciler = reconciler_from_env()?;
            let outcomes = match cohort {
                Some(cohort) => vec![reconciler.reconcile(cohort).await?],
                None => reconciler.sync().await?.cohorts,
            };
            for (outcome, path) in outcomes.iter().zip(write_outcomes(&out_dir, &outcomes)?) {
                println!(
                    "{}: {} of {} register rows need intervention -> {}",
                    outcome.cohort.label(),
                    outcome.interventions.len(),
                    outcome.register_rows,
                    path.display()
                );
            }
        }
        Some(Commands::Tracked { cohort }) => {
            let reconciler = reconciler_from_env()?;
            let table = reconciler.tracked_table(cohort).await?;
            print!("{}", to_csv(&table)?);
        }
        Some(Commands::Diff {
            register,
            tracked,
            id_column,
            tracked_id_column,
        }) => {
            let tracked_id_column = tracked_id_column.unwrap_or_else(|| id_column.clone());
            print!(
                "{}",
                diff_files(&register, &tracked, &id_column, &tracked_id_column)?
            );
        }
        None => {
            println!("Use --help for usage");
        }
    }

    Ok(())
}

/// Builds a reconciler backed by the live Sheets and Notion clients.
fn reconciler_from_env() -> anyhow::Result<Reconciler> {
    let cfg = SyncConfig::from_lookup(|key| std::env::var(key).ok())?;
    let sheets = SheetsClient::new(
        cfg.spreadsheet_id(),
        cfg.sheets_credential().clone(),
        cfg.http_timeout(),
    )?;
    let notion = NotionClient::new(cfg.notion_token(), cfg.http_timeout())?;
    Ok(Reconciler::new(
        Arc::new(sheets),
        Arc::new(notion),
        cfg.cohorts().to_vec(),
    ))
}

/// Writes each outcome's CSV to `out_dir`, returning the paths in outcome order.
fn write_outcomes(out_dir: &Path, outcomes: &[CohortOutcome]) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut paths = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let path = out_dir.join(&outcome.filename);
        fs::write(&path, &outcome.csv)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(cohort = %outcome.cohort, path = %path.display(), "wrote intervention list");
        paths.push(path);
    }
    Ok(paths)
}

/// Reconciles two CSV files offline.
fn diff_files(
    register: &Path,
    tracked: &Path,
    register_id_column: &str,
    tracked_id_column: &str,
) -> anyhow::Result<String> {
    let register = load_csv(register)?;
    let tracked = load_csv(tracked)?;
    let interventions =
        compute_intervention_keyed(&register, register_id_column, &tracked, tracked_id_column)?;
    Ok(to_csv(&interventions)?)
}

fn load_csv(path: &Path) -> anyhow::Result<sync_core::Table> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(read_csv(&name, file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::Table;

    fn outcome(cohort: Cohort, csv: &str) -> CohortOutcome {
        CohortOutcome {
            cohort,
            filename: cohort.default_filename().to_owned(),
            register_rows: 2,
            tracked_rows: 1,
            interventions: Table::new(cohort.label(), vec!["NHS number".into()]).unwrap(),
            csv: csv.to_owned(),
        }
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "register-sync",
            "sync",
            "--out-dir",
            "out",
            "--cohort",
            "SMI",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Sync { out_dir, cohort }) => {
                assert_eq!(out_dir, PathBuf::from("out"));
                assert_eq!(cohort, Some(Cohort::Smi));
            }
            _ => panic!("expected sync"),
        }

        let cli = Cli::try_parse_from([
            "register-sync",
            "diff",
            "--register",
            "r.csv",
            "--tracked",
            "t.csv",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Diff {
                id_column,
                tracked_id_column,
                ..
            }) => {
                assert_eq!(id_column, "NHS number");
                assert_eq!(tracked_id_column, None);
            }
            _ => panic!("expected diff"),
        }

        assert!(Cli::try_parse_from(["register-sync", "tracked", "--cohort", "asthma"]).is_err());
    }

    #[test]
    fn writes_one_file_per_cohort() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("exports");
        let outcomes = vec![
            outcome(Cohort::Diabetes, "NHS number\n111\n"),
            outcome(Cohort::Smi, "NHS number\n"),
        ];

        let paths = write_outcomes(&out_dir, &outcomes).unwrap();

        assert_eq!(paths[0], out_dir.join("diabetes_interventions.csv"));
        assert_eq!(fs::read_to_string(&paths[0]).unwrap(), "NHS number\n111\n");
        assert_eq!(fs::read_to_string(&paths[1]).unwrap(), "NHS number\n");
    }

    #[test]
    fn diff_files_reconciles_local_exports() {
        let dir = tempfile::tempdir().unwrap();
        let register = dir.path().join("register.csv");
        let tracked = dir.path().join("tracked.csv");
        fs::write(&register, "NHS number,Name\n111,A\n222,B\n333,C\n333,C\n").unwrap();
        fs::write(&tracked, "Status,NHS no\nBooked,111\n").unwrap();

        let csv = diff_files(&register, &tracked, "NHS number", "NHS no").unwrap();

        assert_eq!(csv, "NHS number,Name\n222,B\n333,C\n333,C\n");
    }

    #[test]
    fn diff_files_reports_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let register = dir.path().join("register.csv");
        let tracked = dir.path().join("tracked.csv");
        fs::write(&register, "NHS number,Name\n111,A\n").unwrap();
        fs::write(&tracked, "Name\nA\n").unwrap();

        let err = diff_files(&register, &tracked, "NHS number", "NHS number").unwrap_err();
        assert!(err.to_string().contains("tracked has no identifier column"), "{err}");
    }
}
