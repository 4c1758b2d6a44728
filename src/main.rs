use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedme::app::{AppContext, FeedmeError};
use feedme::cli::{commands, Cli, Commands};
use feedme::config::Config;
use feedme::source::ROSTER;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Tui);
    init_tracing(matches!(command, Commands::Tui));

    if let Commands::Sources = command {
        commands::list_sources(&mut io::stdout())?;
        return Ok(());
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "Using default configuration");
            Config::default()
        }
    };

    let ctx = match AppContext::new(config, cli.source.as_deref(), cli.feed.as_deref()) {
        Ok(ctx) => ctx,
        Err(FeedmeError::UnknownSource(name)) => {
            eprintln!("Unknown source: {}", name);
            eprintln!("Valid sources:");
            for (key, description) in ROSTER {
                eprintln!("  {:<10} {}", key, description);
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout = io::stdout();
    match command {
        Commands::Tui => feedme::tui::run(ctx).await?,
        Commands::List { limit } => commands::list_stories(&ctx, limit, &mut stdout).await?,
        Commands::Comments { n, depth } => {
            commands::show_comments(&ctx, n, depth, &mut stdout).await?
        }
        Commands::Feeds => commands::list_feeds(&ctx, &mut stdout)?,
        Commands::Sources => {}
    }

    Ok(())
}

/// The TUI owns the terminal, so its logs go to a file; one-shot commands
/// log to stderr.
fn init_tracing(tui: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    if tui {
        let file = dirs::data_dir()
            .map(|dir| dir.join("feedme"))
            .and_then(|dir| fs::create_dir_all(&dir).ok().map(|_| dir.join("feedme.log")))
            .and_then(|path| OpenOptions::new().create(true).append(true).open(path).ok());

        if let Some(file) = file {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .with(filter)
                .init();
        }
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}
