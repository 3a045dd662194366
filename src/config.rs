//! Runtime configuration with defaults matching the hosted spreadsheet service.
use crate::helpers::reader::DEFAULT_BASE_URL;
use crate::helpers::reader::DEFAULT_USER_AGENT;
use crate::spreadsheet::handle::WorksheetHandle;
use crate::spreadsheet::FetchRequest;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the text-generation API key.
pub const API_KEY_ENV: &str = "NPS_LLM_API_KEY";

/// Per-request timeouts, by caller urgency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Caller-supplied handles
    pub explicit: Duration,
    /// Single-worksheet layout, positional indices and exact names
    pub targeted: Duration,
    /// Name search, hashed guesses and the numeric sweep
    pub search: Duration,
    /// Exhaustive sweep
    pub exhaustive: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            explicit: Duration::from_secs(15),
            targeted: Duration::from_secs(10),
            search: Duration::from_secs(5),
            exhaustive: Duration::from_secs(3),
        }
    }
}

/// Options for one discovery run.
#[derive(Clone, Debug)]
pub struct DiscoveryOptions {
    /// Document base URL used to build retrieval URLs
    pub base_url: String,
    /// User agent sent with every probe
    pub user_agent: String,
    /// Handles supplied by the caller, tried before any guessing
    pub explicit_handles: Vec<WorksheetHandle>,
    /// Per-request timeouts
    pub timeouts: Timeouts,
    /// Minimal plausible body size in bytes
    pub min_body_len: usize,
    /// Minimal plausible body size for the exact-name strategy
    pub exact_name_min_body_len: usize,
    /// Attempts per caller-supplied handle
    pub explicit_attempts: usize,
    /// Cap on hash-derived handle guesses
    pub max_hashed_guesses: usize,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            explicit_handles: Vec::new(),
            timeouts: Timeouts::default(),
            min_body_len: 50,
            exact_name_min_body_len: 100,
            explicit_attempts: 2,
            max_hashed_guesses: 100,
        }
    }
}

impl DiscoveryOptions {
    pub fn request(&self, timeout: Duration) -> FetchRequest {
        FetchRequest::new(timeout, self.min_body_len)
    }
}

/// Text-generation service settings.
#[derive(Clone, Debug)]
pub struct InsightConfig {
    /// Base URL of an OpenAI-compatible API
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Bearer credential; without it the templated summary is used
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o".to_owned(),
            temperature: 0.3,
            max_tokens: 1500,
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl InsightConfig {
    /// Defaults with the API key taken from [`API_KEY_ENV`] when set and non-blank.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty());
        Self { api_key, ..Self::default() }
    }
}

/// Result cache settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    pub directory: PathBuf,
    /// Entries older than this are misses
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("cache"),
            ttl: Duration::from_secs(60 * 60),
        }
    }
}
