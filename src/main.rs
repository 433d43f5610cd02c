use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dredge::cli::{
    handle_item_command, handle_link_command, handle_vault_command, Context, ItemCommands,
    LinkCommands, VaultCommands,
};
use dredge::config::DredgePaths;
use dredge::services::heal;

#[derive(Parser)]
#[command(
    name = "dredge",
    version,
    about = "Encrypted storage for secrets, credentials and config files",
    long_about = "dredge keeps secrets and config files encrypted at rest. Text items \
                  can be linked into place with a symlink; edits made through the \
                  link are folded back into the vault on the next read."
)]
struct Cli {
    /// Vault password (skips the prompt and the session cache)
    #[arg(long, global = true, env = "DREDGE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Item(ItemCommands),

    #[command(flatten)]
    Link(LinkCommands),

    #[command(flatten)]
    Vault(VaultCommands),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env("DREDGE_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("dredge=debug")
        } else {
            EnvFilter::new("dredge=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    let paths = DredgePaths::new()?;
    let ctx = Context::open(paths, cli.password)?;

    // First command in a new terminal cleans up after earlier sessions
    if !ctx.session.has_active_session() {
        match heal::run(&ctx.storage) {
            Ok(report) if !report.is_empty() => debug!(?report, "self-heal cleaned up"),
            Ok(_) => {}
            Err(e) => debug!(error = %e, "self-heal failed"),
        }
    }

    match cli.command {
        Commands::Item(cmd) => handle_item_command(&ctx, cmd)?,
        Commands::Link(cmd) => handle_link_command(&ctx, cmd)?,
        Commands::Vault(cmd) => handle_vault_command(&ctx, cmd)?,
    }

    Ok(())
}
