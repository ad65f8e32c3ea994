mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "musings")]
#[command(about = "Publish a markdown blog as a static website", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the static site from the posts directory
    Publish {
        #[arg(long, short, default_value = "posts")]
        posts: PathBuf,

        #[arg(long, short, default_value = "public")]
        output: PathBuf,

        #[arg(long, default_value = "default")]
        theme: String,

        #[arg(long, default_value = musings::CONFIG_FILE)]
        config: PathBuf,

        #[arg(long)]
        base_url: Option<String>,
    },
    /// Load the posts for syncing to external platforms
    Sync {
        #[arg(long, short, default_value = "posts")]
        posts: PathBuf,

        /// Print the published posts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a config file and a posts directory with a first post
    Init {
        #[arg(long, short, default_value = "posts")]
        posts: PathBuf,
    },
}

fn init_logging() {
    let log_environ = env_logger::Env::new()
        .filter("MUSINGS_LOG")
        .write_style("MUSINGS_LOG_STYLE");
    let mut log_builder = env_logger::Builder::new();

    log_builder.filter_level(log::LevelFilter::Info);
    log_builder.parse_env(log_environ);
    log_builder.init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Publish {
            posts,
            output,
            theme,
            config,
            base_url,
        } => commands::publish(&posts, &output, &theme, &config, base_url.as_deref()),
        Commands::Sync { posts, json } => commands::sync(&posts, json),
        Commands::Init { posts } => commands::init(&posts),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
