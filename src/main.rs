//! cohortbal: Cohort Balancing CLI Tool
//!
//! A command-line tool that balances two cohorts on sex, ethnicity, race and
//! age by inverse-frequency weighted undersampling of the larger cohort.

use anyhow::Result;
use clap::Parser;

use cohortbal::cli::{self, Cli, Commands};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Strata {
                input,
                columns,
                infer_schema_length,
            } => cli::strata::run_strata(input, columns, *infer_schema_length),
            Commands::Manifest {
                input,
                output,
                object_id_column,
                infer_schema_length,
            } => cli::download::run_manifest(
                input,
                output.as_deref(),
                object_id_column,
                *infer_schema_length,
            ),
            Commands::Download {
                manifest,
                dest,
                client,
                profile,
                no_confirm,
            } => cli::download::run_download(manifest, dest, client, profile, *no_confirm),
        };
    }

    cli::balance::run_balance(&cli)
}
