mod cli;
mod commands;
mod config;
mod data_source;
mod engine;
mod progress;
mod provider;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands, StateCommand};
use commands::apply::ApplyOptions;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// `--config` as given
    pub config: Option<String>,
    /// `--state` as given
    pub state: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Err(err) = run(cli) {
        ui::error(&format!("{err:#}"));
        if let Some(client_err) = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<iotcentral_client::Error>())
        {
            let category = client_err.category();
            eprintln!("  {}: {}", category.description(), category.advice());
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        state: cli.state,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Commands::Plan(args) => commands::plan::run(
            &ctx,
            args.target.as_deref(),
            args.refresh,
            args.jobs.jobs,
        ),
        Commands::Apply(args) => commands::apply::apply(
            &ctx,
            &ApplyOptions {
                target: args.target.as_deref(),
                yes: args.yes,
                dry_run: args.dry_run,
                jobs: args.jobs.jobs,
                refresh: args.refresh,
            },
        ),
        Commands::Refresh(args) => commands::refresh::run(&ctx, args.jobs),
        Commands::Import { address, id } => commands::import::run(&ctx, &address, &id),
        Commands::Destroy(args) => commands::apply::destroy(
            &ctx,
            &ApplyOptions {
                target: args.target.as_deref(),
                yes: args.yes,
                jobs: args.jobs.jobs,
                ..Default::default()
            },
        ),
        Commands::State(cmd) => match cmd {
            StateCommand::List => commands::state::list(&ctx),
            StateCommand::Show { address } => commands::state::show(&ctx, &address),
        },
        Commands::Devices(args) => commands::data::devices(&ctx, args.json),
        Commands::Organizations(args) => commands::data::organizations(&ctx, args.json),
        Commands::Role {
            display_name,
            output,
        } => commands::data::role(&ctx, &display_name, output.json),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "iotc", &mut io::stdout());
            Ok(())
        }
    }
}
