//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;

use crate::config::Config;
use crate::logging;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli)?;

    // Load configuration, then let flags override it
    let mut config = Config::load(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let ctx = commands::Context {
        config,
        output_format: cli.output.unwrap_or_default(),
        no_color: cli.no_color,
    };

    match cli.command {
        Commands::Simplify => commands::simplify::execute(ctx).await,
        Commands::Add(args) => commands::add::execute(ctx, args).await,
        Commands::Allow(args) => commands::allow::execute(ctx, args).await,
        Commands::Zone(args) => commands::zone::execute(ctx, args).await,
        Commands::Addgen(args) => commands::add::addgen(ctx, args).await,
        Commands::Rpz(args) => commands::rpz::execute(ctx, args).await,
        Commands::List(args) => commands::list::execute(ctx, args).await,
        Commands::Check(args) => commands::check::execute(ctx, args).await,
        Commands::Advise(args) => commands::advise::execute(ctx, args).await,
        Commands::Processlog(args) => commands::processlog::execute(ctx, args).await,
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(blocked) = &cli.blocked {
        config.files.blocked.clone_from(blocked);
    }
    config.files.extra_blocked.extend(cli.extra_blocked.iter().cloned());
    if let Some(allowed) = &cli.allowed {
        config.files.allowed.clone_from(allowed);
    }
    if cli.no_aliases {
        config.resolver.follow_aliases = false;
    }
}
