//! JSON context config: both `beans` forms, declared order, settings.

use sprig_rs::tweets;
use sprig_rs::{BeanDescription, ConfigError, ContextConfig, DescriptionSource, HookFailurePolicy};

#[test]
fn map_form_keeps_document_order() {
    let config = ContextConfig::from_json_str(
        r#"{
            "beans": {
                "zeta": { "type": "Tweet" },
                "FirstBean": { "type": "TestBean", "isPrototype": true },
                "alpha": { "type": "Tweet", "prototype": false }
            }
        }"#,
    )
    .unwrap();
    assert_eq!(
        config.beans,
        vec![
            BeanDescription::singleton("zeta", "Tweet"),
            BeanDescription::prototype("FirstBean", "TestBean"),
            BeanDescription::singleton("alpha", "Tweet"),
        ]
    );
}

#[test]
fn list_form_accepts_both_prototype_spellings() {
    let config = ContextConfig::from_json_str(
        r#"{
            "beans": [
                { "name": "b", "type": "Tweet", "isPrototype": true },
                { "name": "a", "type": "Tweet" },
                { "name": "c", "type": "Tweet", "prototype": true }
            ]
        }"#,
    )
    .unwrap();
    let names: Vec<&str> = config.beans.iter().map(|d| d.name()).collect();
    assert_eq!(names, ["b", "a", "c"]);
    assert!(config.beans[0].is_prototype());
    assert!(!config.beans[1].is_prototype());
    assert!(config.beans[2].is_prototype());
}

#[test]
fn empty_document_yields_defaults() {
    let config = ContextConfig::from_json_str("{}").unwrap();
    assert!(config.beans.is_empty());
    assert_eq!(config, ContextConfig::default());

    let config = ContextConfig::from_json_str(r#"{ "beans": null }"#).unwrap();
    assert!(config.descriptions().unwrap().is_empty());
}

#[test]
fn settings_and_logging_are_read() {
    let config = ContextConfig::from_json_str(
        r#"{
            "settings": { "eagerInit": true, "postConstructFailure": "log" },
            "logging": { "level": "debug", "json": true }
        }"#,
    )
    .unwrap();
    assert!(config.settings.eager_init);
    assert_eq!(config.settings.post_construct_failure, HookFailurePolicy::Log);
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn beans_of_the_wrong_shape_are_rejected() {
    let err = ContextConfig::from_json_str(r#"{ "beans": "tweet" }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));

    let err = ContextConfig::from_json_str(r#"{ "beans": { "tweet": { "prototype": true } } }"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn missing_file_reports_its_path() {
    let err = ContextConfig::from_path("does/not/exist.json").unwrap_err();
    match err {
        ConfigError::Io { path, .. } => assert!(path.ends_with("exist.json")),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn shipped_tweet_config_builds_a_container() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/tweets.json");
    let config = ContextConfig::from_path(path).unwrap();
    let container = config.container(tweets::registry().unwrap()).unwrap();
    assert_eq!(container.bean_names(), ["tweetRepository", "tweetService", "tweet"]);
    assert!(container.description("tweet").unwrap().is_prototype());
}

#[test]
fn eager_config_instantiates_singletons_at_build() {
    let config = ContextConfig::from_json_str(
        r#"{
            "settings": { "eagerInit": true },
            "beans": {
                "tweetRepository": { "type": "InMemTweetRepository" },
                "tweetService": { "type": "SimpleTweetService" },
                "tweet": { "type": "Tweet", "isPrototype": true }
            }
        }"#,
    )
    .unwrap();
    let container = config.container(tweets::registry().unwrap()).unwrap();
    assert!(container.is_instantiated("tweetRepository"));
    assert!(container.is_instantiated("tweetService"));
    assert!(!container.is_instantiated("tweet"));
    assert_eq!(container.singleton_count(), 2);
}
