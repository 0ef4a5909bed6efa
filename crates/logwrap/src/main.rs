//! Logwrap CLI - supervised process launcher with rotating logs

use anyhow::Result;
use clap::Parser;
use logwrap_core::{constants, units, RotationPolicy};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod supervisor;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("logwrap={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let work_dir = match cli.work_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    let result = match cli.command {
        Commands::Run(args) => {
            std::fs::create_dir_all(&work_dir)?;
            let work_dir = work_dir.canonicalize()?;
            let options = build_options(&work_dir, args)?;
            let code = supervisor::run(options).await?;
            std::process::exit(code);
        }
        Commands::Kill => commands::kill::execute(&work_dir.canonicalize()?).await,
        Commands::Set(args) => commands::set::execute(&work_dir.canonicalize()?, args).await,
        Commands::Get => commands::get::execute(&work_dir.canonicalize()?).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn build_options(
    work_dir: &std::path::Path,
    args: cli::RunArgs,
) -> Result<supervisor::SupervisorOptions> {
    let mut policy = RotationPolicy::default();
    if let Some(size) = &args.max_size {
        policy.max_size_bytes = units::parse_size(size)?;
    }
    if let Some(duration) = &args.duration {
        policy.max_age = units::parse_duration(duration)?;
    }
    if let Some(logs) = args.logs {
        policy.max_files = logs;
    }
    if let Some(interval) = &args.check_interval {
        policy.maintenance_interval = units::parse_duration(interval)?;
    }
    policy.compress = args.zip;

    Ok(supervisor::SupervisorOptions {
        work_dir: work_dir.to_path_buf(),
        command: args.app,
        args: args.args,
        out_file: args
            .out
            .unwrap_or_else(|| constants::DEFAULT_OUT_FILE.to_string()),
        err_file: args.err,
        err_only: args.err_only,
        screen: args.screen,
        policy,
    })
}
