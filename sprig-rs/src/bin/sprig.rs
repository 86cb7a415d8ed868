//! CLI for sprig-rs: inspect a JSON context and resolve its beans.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sprig_rs::tweets::{self, TweetRepository, TweetService};
use sprig_rs::{init_logging, BeanDescription, Container, ContextConfig};

#[derive(Parser)]
#[command(name = "sprig")]
#[command(about = "Sprig Rust CLI")]
struct Cli {
    /// JSON context config; the built-in tweet context when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print bean names in declared order.
    List,
    /// Resolve beans by name and report their scope.
    Resolve {
        /// Bean names (e.g. tweetService tweet)
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print all tweets through the tweet service.
    Tweets {
        /// Name of the TweetService bean
        #[arg(long, default_value = "tweetService")]
        service: String,
    },
}

fn default_config() -> ContextConfig {
    ContextConfig {
        beans: vec![
            BeanDescription::singleton("tweetRepository", "InMemTweetRepository"),
            BeanDescription::singleton("tweetService", "SimpleTweetService"),
            BeanDescription::prototype("tweet", "Tweet"),
        ],
        ..ContextConfig::default()
    }
}

fn run_list(container: &Container) {
    for name in container.bean_names() {
        println!("{name}");
    }
}

fn run_resolve(
    container: &Container,
    names: &[String],
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    for name in names {
        let bean = container.get_bean(name)?;
        let scope = container
            .description(name)
            .map(|d| d.scope())
            .unwrap_or_default();
        println!("{} ({:?})", bean.name(), scope);
    }
    Ok(())
}

fn run_tweets(
    container: &Container,
    service: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let service = container.get::<Arc<dyn TweetService>>(service)?;
    for tweet in service.all_tweets() {
        println!("{tweet}");
    }
    if container.contains_bean("tweetRepository") {
        let repository = container.get::<Arc<dyn TweetRepository>>("tweetRepository")?;
        println!(
            "service uses the tweetRepository singleton: {}",
            Arc::ptr_eq(service.repository(), &repository)
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ContextConfig::from_path(path)?,
        None => default_config(),
    };
    init_logging(&config.logging)?;

    let container = config.container(tweets::registry()?)?;
    match cli.command {
        Commands::List => {
            run_list(&container);
            Ok(())
        }
        Commands::Resolve { names } => run_resolve(&container, &names),
        Commands::Tweets { service } => run_tweets(&container, &service),
    }
}
