mod chat;
mod commands;
mod config;
mod render;

use clap::{Args, Parser, Subcommand};

use crate::commands::Connection;

#[derive(Parser)]
#[command(name = "counsel", about = "counsel CLI - legal advisory chat in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ServerArgs {
    /// Server URL for this run (overrides config and COUNSEL_SERVER_URL)
    #[arg(long)]
    server: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive consultation
    Chat {
        /// Resume an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        #[command(flatten)]
        connect: ServerArgs,
    },

    /// Send a single message and print the resulting consultation
    Send {
        text: String,
        #[arg(long)]
        session: Option<String>,
        #[command(flatten)]
        connect: ServerArgs,
    },

    /// List this client's sessions
    History {
        #[command(flatten)]
        connect: ServerArgs,
    },

    /// Print a session's transcript, issues and checklists
    Show {
        session: String,
        #[command(flatten)]
        connect: ServerArgs,
    },

    /// Show or set configuration
    Config {
        /// Persist the server URL
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli.command).await;

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Chat { session, connect } => {
            let conn = Connection::open(connect.server.as_deref())?;
            chat::run_chat(conn, session).await
        }
        Commands::Send {
            text,
            session,
            connect,
        } => {
            let conn = Connection::open(connect.server.as_deref())?;
            commands::run_send(conn, &text, session).await
        }
        Commands::History { connect } => {
            commands::run_history(Connection::open(connect.server.as_deref())?).await
        }
        Commands::Show { session, connect } => {
            let conn = Connection::open(connect.server.as_deref())?;
            commands::run_show(conn, &session).await
        }
        Commands::Config { server } => match server {
            Some(url) => config::set_config(&url),
            None => config::show_config(),
        },
    }
}
