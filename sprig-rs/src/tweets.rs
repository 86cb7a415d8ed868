//! Demo domain: tweets, a repository and a service, wired by type-name convention.
//!
//! `SimpleTweetService` declares one constructor parameter of type `dyn TweetRepository`,
//! so the container resolves it from the bean named `tweetRepository`.

use std::fmt;
use std::sync::Arc;

use sprig_core::{
    ArgumentError, BeanType, Dependency, Intercepted, RegistrationError, TypeRegistry,
};
use sprig_rs_macros::intercepted;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tweet {
    pub user: String,
    pub text: String,
}

impl Tweet {
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Tweet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}: {}", self.user, self.text)
    }
}

#[intercepted]
pub trait TweetRepository: Send + Sync {
    fn all_tweets(&self) -> Vec<Tweet>;
}

/// Repository kept in memory; `init` seeds it.
#[derive(Debug, Default)]
pub struct InMemTweetRepository {
    tweets: Vec<Tweet>,
}

impl InMemTweetRepository {
    pub fn init(&mut self) {
        self.tweets = vec![
            Tweet::new("john", "first tweet"),
            Tweet::new("ann", "second tweet"),
        ];
    }
}

impl TweetRepository for InMemTweetRepository {
    fn all_tweets(&self) -> Vec<Tweet> {
        self.tweets.clone()
    }
}

#[intercepted]
pub trait TweetService: Send + Sync {
    fn all_tweets(&self) -> Vec<Tweet>;
    fn repository(&self) -> &Arc<dyn TweetRepository>;
}

pub struct SimpleTweetService {
    repository: Arc<dyn TweetRepository>,
}

impl SimpleTweetService {
    pub fn new(repository: Arc<dyn TweetRepository>) -> Self {
        Self { repository }
    }
}

impl TweetService for SimpleTweetService {
    fn all_tweets(&self) -> Vec<Tweet> {
        self.repository.all_tweets()
    }

    fn repository(&self) -> &Arc<dyn TweetRepository> {
        &self.repository
    }
}

/// Install the tweet types: `InMemTweetRepository`, `SimpleTweetService` and the
/// `Tweet` value type (meant for prototype beans).
pub fn register_types(registry: &mut TypeRegistry) -> Result<(), RegistrationError> {
    registry
        .register(
            BeanType::of::<InMemTweetRepository>()
                .default_constructor()
                .init(InMemTweetRepository::init)
                .expose(|repo| Arc::new(repo) as Arc<dyn TweetRepository>),
        )?
        .register(
            BeanType::of::<SimpleTweetService>()
                .constructor([Dependency::of::<dyn TweetRepository>()], |args| {
                    let repository = args.next::<Arc<dyn TweetRepository>>()?;
                    Ok::<_, ArgumentError>(SimpleTweetService::new(repository))
                })
                .benchmark("all_tweets")
                .expose(|service| Arc::new(service) as Arc<dyn TweetService>)
                .intercept(|proxy| Arc::new(proxy) as Arc<dyn TweetService>),
        )?
        .register(BeanType::of::<Tweet>().default_constructor())?;
    Ok(())
}

/// Registry holding only the tweet types.
pub fn registry() -> Result<TypeRegistry, RegistrationError> {
    let mut registry = TypeRegistry::new();
    register_types(&mut registry)?;
    Ok(registry)
}
