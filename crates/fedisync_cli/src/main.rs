//! fedisync CLI
//!
//! Command-line tools for watching and debugging server push streams.
//!
//! # Commands
//!
//! - `watch` - Stream a topic into an in-memory store and report changes
//! - `decode` - Decode push frames read from stdin
//! - `url` - Print the streaming URL for a topic

mod commands;

use clap::{Parser, Subcommand};
use fedisync_protocol::Topic;
use tracing_subscriber::EnvFilter;

/// fedisync command-line tools.
#[derive(Parser)]
#[command(name = "fedisync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server base URL (e.g., https://social.example)
    #[arg(global = true, short, long, env = "FEDISYNC_BASE_URL")]
    base_url: Option<String>,

    /// Access token, sent as the WebSocket sub-protocol and as bearer auth
    #[arg(global = true, long, env = "FEDISYNC_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a topic into an in-memory store and report changes
    Watch {
        /// Topic to subscribe to (user, public:local, hashtag:rust, list:42, ...)
        #[arg(short, long, default_value = "user")]
        topic: Topic,

        /// Id of the signed-in account, for follow updates
        #[arg(long, env = "FEDISYNC_ME")]
        me: Option<String>,

        /// REST path polled while the stream is down (e.g., /api/v1/timelines/home)
        #[arg(long)]
        poll_url: Option<String>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Decode push frames read from stdin, one per line
    Decode {
        /// Apply the frames to an in-memory store and print the result
        #[arg(short, long)]
        apply: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the streaming URL for a topic
    Url {
        /// Topic to subscribe to
        #[arg(short, long, default_value = "user")]
        topic: Topic,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Watch {
            topic,
            me,
            poll_url,
            duration,
            format,
        } => {
            let base_url = cli.base_url.ok_or("--base-url required for watch")?;
            let options = commands::watch::WatchOptions {
                base_url,
                token: cli.token,
                topic,
                me,
                poll_url,
                duration: duration.map(std::time::Duration::from_secs),
                json: format == "json",
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(commands::watch::run(options))?;
        }
        Commands::Decode { apply, format } => {
            let stdin = std::io::stdin();
            commands::decode::run(stdin.lock(), apply, &format)?;
        }
        Commands::Url { topic } => {
            let base_url = cli.base_url.ok_or("--base-url required for url")?;
            println!("{}", fedisync_protocol::streaming_url(&base_url, &topic)?);
        }
        Commands::Version => {
            println!("fedisync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("fedisync client v{}", fedisync_client::VERSION);
        }
    }

    Ok(())
}
