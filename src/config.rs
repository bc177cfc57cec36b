//! Process configuration, read once at startup.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;

use crate::services::completion::{CompletionClient, DEFAULT_ENDPOINT};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const COMPLETION_URL_VAR: &str = "SQLPROMPT_COMPLETION_URL";

#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: Option<String>,
    pub completion_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "********"))
            .field("completion_url", &self.completion_url)
            .finish()
    }
}

impl Config {
    /// Reads the environment, then `.env` (working directory or a parent)
    /// for anything the environment leaves unset.
    pub fn load() -> Self {
        Self::layered(|key| std::env::var(key).ok(), env_file_vars(dotenvy::dotenv_iter()))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment values win over `.env` entries. A blank environment value
    /// falls through to the file.
    pub fn layered<F>(lookup: F, file_vars: HashMap<String, String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_lookup(|key| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_vars.get(key).cloned())
        })
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            api_key: non_blank(API_KEY_VAR),
            completion_url: non_blank(COMPLETION_URL_VAR)
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }

    /// Command-line override for the completion endpoint
    pub fn with_completion_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.completion_url = url;
        }
        self
    }

    pub fn completion_client(&self) -> CompletionClient {
        CompletionClient::builder()
            .api_key(self.api_key.clone())
            .endpoint(self.completion_url.clone())
            .build()
    }
}

/// Collects the entries of a parsed `.env` file. A missing file is empty;
/// unreadable files and malformed lines are logged and skipped.
pub fn env_file_vars(
    iter: Result<dotenvy::Iter<File>, dotenvy::Error>,
) -> HashMap<String, String> {
    let iter = match iter {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return HashMap::new(),
        Err(e) => {
            tracing::warn!("Failed to read .env: {}", e);
            return HashMap::new();
        }
    };

    iter.filter_map(|entry| {
        entry
            .inspect_err(|e| tracing::warn!("Skipping .env entry: {}", e))
            .ok()
    })
    .collect()
}
