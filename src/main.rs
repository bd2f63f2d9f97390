use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "learnpath")]
#[command(about = "Grade exercises, track progress and award badges")]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ~/.learnpath/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database (overrides store.path from the config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a commented default config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Load modules, exercises and badges from a TOML catalog
    Seed {
        /// Catalog file
        catalog: PathBuf,
    },

    /// Run the HTTP API until interrupted
    Serve {
        /// Port (overrides server.port from the config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Register a new learner
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Submit an answer for an exercise
    Submit {
        /// Acting user id
        #[arg(short, long)]
        user: String,

        /// Exercise id
        #[arg(short, long)]
        exercise: String,

        /// JSON file with the submission (reads stdin when omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show module progress for a user
    Progress {
        #[arg(short, long)]
        user: String,

        /// Show per-exercise detail for one module
        #[arg(short, long)]
        module: Option<String>,
    },

    /// Show a user's points and badges
    Profile {
        #[arg(short, long)]
        user: String,
    },

    /// List the badge catalog
    Badges,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let ctx = cli::Context::new(cli.config, cli.db);

    match cli.command {
        Commands::Init { force } => {
            cli::init::init_command(&ctx, force)?;
        }
        Commands::Seed { catalog } => {
            cli::seed::seed_command(&ctx, &catalog).await?;
        }
        Commands::Serve { port } => {
            cli::serve::serve_command(&ctx, port).await?;
        }
        Commands::Register { name, email } => {
            cli::user::register_command(&ctx, &name, &email).await?;
        }
        Commands::Submit {
            user,
            exercise,
            file,
        } => {
            cli::submit::submit_command(&ctx, &user, &exercise, file.as_deref()).await?;
        }
        Commands::Progress { user, module } => {
            cli::progress::progress_command(&ctx, &user, module.as_deref()).await?;
        }
        Commands::Profile { user } => {
            cli::user::profile_command(&ctx, &user).await?;
        }
        Commands::Badges => {
            cli::badges::badges_command(&ctx).await?;
        }
    }

    Ok(())
}
