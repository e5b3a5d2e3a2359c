use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use model_sync::config;
use model_sync::schema::MigrationStep;
use model_sync::utils::logging::init_logging;
use model_sync::{Confirmation, ModelSyncClient, SyncReport, SyncStatus};

#[derive(Parser)]
#[command(name = "model_sync", version, about = "Find and fix database inconsistencies for model definitions")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "model_sync.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compare a model group with the database and apply the differences
    UpgradeDatabase {
        /// The model group to check
        group: String,

        /// Perform the database changes without asking permission
        #[arg(long)]
        force: bool,

        /// Only list the statements
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(report) if report.has_failures() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<SyncReport> {
    let cli = Cli::parse();

    let mut config = config::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config))?;
    init_logging(&config.logging)?;

    let Command::UpgradeDatabase {
        group,
        force,
        dry_run,
    } = cli.command;
    config.migrations.dry_run |= dry_run;

    let client = ModelSyncClient::new(config)
        .await
        .context("connecting to the database")?;

    let confirmation = Confirmation::Prompt(Box::new(move |steps: &[MigrationStep]| {
        confirm_plan(steps, force, &mut io::stdout(), &mut io::stdin().lock())
    }));

    let report = client.upgrade_database(&group, confirmation).await?;
    print_report(&report);
    Ok(report)
}

/// List the plan, then ask unless forced
fn confirm_plan(
    steps: &[MigrationStep],
    force: bool,
    out: &mut impl Write,
    input: &mut impl BufRead,
) -> bool {
    for step in steps {
        if writeln!(out, "{}", step).is_err() {
            return false;
        }
    }
    if force {
        return true;
    }

    if write!(out, "Do you want to apply this on the database? (y/n): ")
        .and_then(|_| out.flush())
        .is_err()
    {
        return false;
    }

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}

fn print_steps(steps: &[MigrationStep]) {
    for step in steps {
        println!("{}", step);
    }
}

fn print_report(report: &SyncReport) {
    for failure in &report.translation_failures {
        println!("  {}", failure);
    }
    for change in &report.skipped_changes {
        println!("  {}", change);
    }

    match report.status {
        SyncStatus::NoModels => println!("No model definitions were found, halting execution"),
        SyncStatus::NoDifferences => println!("No differences detected."),
        SyncStatus::OnlySkippedChanges => println!("No statements can be applied"),
        SyncStatus::DryRun => print_steps(&report.steps),
        SyncStatus::Declined => println!("Nothing applied"),
        SyncStatus::Applied => {
            for (step, message) in report.failed_steps() {
                println!("  Failed: {}\n    {}", step, message);
            }
            println!(
                "Done: {} of {} statements applied",
                report.applied_count(),
                report.steps.len()
            );
        }
    }

    if let Some(path) = &report.plan_file {
        println!("Plan written to {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_sync::schema::StepKind;

    fn plan() -> Vec<MigrationStep> {
        vec![MigrationStep {
            kind: StepKind::AddColumn,
            table: "foo".to_string(),
            sql: "ALTER TABLE `foo` ADD `name` VARCHAR(255) NULL".to_string(),
        }]
    }

    #[test]
    fn test_forced_plan_is_listed_without_asking() {
        let mut out = Vec::new();
        let mut input: &[u8] = b"";

        assert!(confirm_plan(&plan(), true, &mut out, &mut input));

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(printed, "ALTER TABLE `foo` ADD `name` VARCHAR(255) NULL;\n");
    }

    #[test]
    fn test_prompted_plan_is_listed_before_the_question() {
        let mut out = Vec::new();
        let mut input: &[u8] = b"Y\n";

        assert!(confirm_plan(&plan(), false, &mut out, &mut input));

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("ALTER TABLE `foo` ADD `name` VARCHAR(255) NULL;\n"));
        assert!(printed.ends_with("(y/n): "));
    }

    #[test]
    fn test_anything_but_yes_declines() {
        for answer in [&b"n\n"[..], &b"yes please\n"[..], &b""[..]] {
            let mut out = Vec::new();
            let mut input = answer;
            assert!(!confirm_plan(&plan(), false, &mut out, &mut input));
        }
    }
}
