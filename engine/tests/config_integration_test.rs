//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be loaded from disk,
//! created with defaults when missing, and validated.

use codify_engine::config::Config;
use sdk::types::{Backend, FeedbackStyle};
use std::fs;

#[test]
fn test_config_toml_parsing() {
    let toml_content = r#"
[core]
log_level = "debug"

[llm]
default_backend = "mistral"

[llm.gemini]
model = "gemini-1.5-pro"
temperature = 0.7

[llm.mistral]
base_url = "https://api.mistral.ai/v1/"
model = "codestral-latest"

[langsmith]
endpoint = "https://eu.api.smith.langchain.com/"
project = "Team Project"
use_demo_key = false
tags = ["Codify Chat", "staging"]

[chat]
max_input_chars = 800
memory_window_pairs = 3
default_feedback_style = "faces"

[ui]
bind = "0.0.0.0:9000"
"#;

    let config = Config::from_toml(toml_content).expect("Failed to parse config");

    assert_eq!(config.core.log_level, "debug");
    assert_eq!(config.llm.default_backend, Backend::Mistral);
    assert_eq!(config.llm.gemini.model, "gemini-1.5-pro");
    assert_eq!(config.llm.gemini.temperature, 0.7);
    assert_eq!(config.llm.mistral.model, "codestral-latest");
    assert_eq!(config.llm.mistral.base_url, "https://api.mistral.ai/v1");
    assert_eq!(
        config.langsmith.endpoint,
        "https://eu.api.smith.langchain.com"
    );
    assert_eq!(config.langsmith.project, "Team Project");
    assert!(!config.langsmith.use_demo_key);
    assert_eq!(config.langsmith.tags.len(), 2);
    assert_eq!(config.chat.max_input_chars, 800);
    assert_eq!(config.chat.memory_window_pairs, 3);
    assert_eq!(config.chat.default_feedback_style, FeedbackStyle::Faces);
    assert_eq!(config.bind_addr().unwrap().port(), 9000);
}

#[test]
fn test_load_or_create_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    assert!(!path.exists());

    let config = Config::load_or_create_at(&path).expect("Failed to create config");
    assert!(path.exists());
    assert_eq!(config.chat.max_input_chars, 500);

    // Second load reads the file back
    let reloaded = Config::load_or_create_at(&path).unwrap();
    assert_eq!(reloaded.langsmith.project, config.langsmith.project);
    assert_eq!(reloaded.llm.default_backend, config.llm.default_backend);
}

#[test]
fn test_load_from_path_reads_user_edits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[core]
[llm]
default_backend = "mistral"
[chat]
memory_window_pairs = 2
"#,
    )
    .unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.llm.default_backend, Backend::Mistral);
    assert_eq!(config.chat.memory_window_pairs, 2);
    assert_eq!(config.chat.max_input_chars, 500);
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load_from_path(&dir.path().join("absent.toml")).is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let cases = [
        "[core]\n[llm]\n[chat]\nmax_input_chars = 0\n",
        "[core]\n[llm]\n[chat]\nmemory_window_pairs = 0\n",
        "[core]\n[llm]\n[langsmith]\nproject = \"  \"\n",
        "[core]\n[llm]\n[langsmith]\nendpoint = \"smith.langchain.com\"\n",
        "[core]\n[llm]\ndefault_backend = \"gpt\"\n",
        "[core]\n[llm]\n[ui]\nbind = \"nowhere\"\n",
    ];

    for toml in cases {
        assert!(Config::from_toml(toml).is_err(), "accepted: {}", toml);
    }
}
