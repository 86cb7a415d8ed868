//! Build the tweet context from JSON and call the benchmarked service.
//!
//! Run with `SPRIG_LOG=debug cargo run --example tweets` to see the timings.

use std::sync::Arc;

use sprig_rs::tweets::{self, TweetService};
use sprig_rs::{init_logging, ContextConfig};

const CONTEXT: &str = include_str!("../config/tweets.json");

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ContextConfig::from_json_str(CONTEXT)?;
    init_logging(&config.logging)?;

    let container = config.container(tweets::registry()?)?;
    println!("beans: {:?}", container.bean_names());

    let service = container.get::<Arc<dyn TweetService>>("tweetService")?;
    for tweet in service.all_tweets() {
        println!("{tweet}");
    }

    let first = container.get_bean("tweet")?;
    let second = container.get_bean("tweet")?;
    println!("prototype gives fresh instances: {}", !first.ptr_eq(&second));
    Ok(())
}
