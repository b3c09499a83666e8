use bardcheck::cli::{Cli, Commands, DbCommand};
use bardcheck::config::{DbUpdateOptions, ScanOptions};
use bardcheck::error::Result;
use bardcheck::report::{Reporter, TerminalReporter};
use bardcheck::{scan, threshold_hit, unknown_hit};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Compact logs to stderr; reports and the summary own stdout.
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Scan(args) => {
            let opts = ScanOptions::from_args(&args)?;
            let outcome = scan::run_scan(&opts).await?;
            let report = &outcome.report;

            scan::write_reports(report, opts.format, &outcome.out_dir)?;
            if let Some(path) = &opts.findings_json {
                scan::write_findings_json(report, &opts, path)?;
            }

            let threshold = threshold_hit(report);
            let unknown = unknown_hit(report);
            let reporter = TerminalReporter::new(opts.list_findings, threshold, unknown);
            print!("{}", reporter.report(report));

            let failed = threshold || (opts.fail_on_unknown && unknown);
            Ok(if failed {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Db(DbCommand::Update(args)) => {
            let opts = DbUpdateOptions::from_args(&args);
            let outcome = scan::run_db_update(&opts).await?;
            println!(
                "advisory cache updated: {} packages, {} advisories ({})",
                outcome.packages,
                outcome.advisories,
                outcome.out_dir.display()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
