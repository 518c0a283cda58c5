//! Configuration loading and management

use anyhow::{Context, Result};
use pitchwire_domain::usecases::{DEFAULT_RUMOR_KEYWORDS, TieBreak};
use pitchwire_domain::{HandleMap, HandleRule, HashtagPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub feeds: FeedsConfig,

    #[serde(default)]
    pub rumors: RumorsConfig,

    #[serde(default)]
    pub stat: StatConfig,

    #[serde(default)]
    pub compose: ComposeConfig,

    #[serde(default)]
    pub x: XConfig,
}

/// Backing store for posted links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupBackend {
    #[default]
    File,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub dedup_backend: DedupBackend,

    #[serde(default = "default_dedup_path")]
    pub dedup_path: PathBuf,

    /// Days to keep posted links; 0 keeps them forever
    #[serde(default)]
    pub retention_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    #[serde(default = "default_window_hours")]
    pub window_hours: u32,

    #[serde(default = "default_select_count")]
    pub select_count: usize,

    #[serde(default = "default_min_title_chars")]
    pub min_title_chars: usize,

    #[serde(default)]
    pub tie_break: TieBreak,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_handles")]
    pub handles: Vec<HandleRule>,

    #[serde(default)]
    pub default_handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RumorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Feeds scanned for transfer gossip; empty reuses `feeds.sources`
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default = "default_rumor_keywords")]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub header: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub pages: Vec<String>,
}

/// How hashtags are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashtagMode {
    #[default]
    Generated,
    Fixed,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    #[serde(default)]
    pub header: Option<String>,

    #[serde(default)]
    pub hashtags: HashtagMode,

    #[serde(default)]
    pub fixed_hashtags: Vec<String>,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Posted when nothing else is available; empty uses the built-in message
    #[serde(default)]
    pub fallback_message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub write: XWriteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XWriteConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_x_user_token_env")]
    pub oauth2_user_token_env: String,

    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default = "default_x_base_url")]
    pub base_url: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_dedup_path() -> PathBuf {
    PathBuf::from("./posted_links.txt")
}

fn default_sources() -> Vec<String> {
    vec![
        "https://www.goal.com/feeds/en/news".to_string(),
        "https://www.skysports.com/rss/12040".to_string(),
        "https://feeds.bbci.co.uk/sport/football/rss.xml".to_string(),
        "https://www.theguardian.com/football/rss".to_string(),
    ]
}

fn default_window_hours() -> u32 {
    4
}

fn default_select_count() -> usize {
    1
}

fn default_min_title_chars() -> usize {
    20
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    pitchwire_adapters::http::DEFAULT_USER_AGENT.to_string()
}

fn default_handles() -> Vec<HandleRule> {
    [
        ("goal.com", "@goal"),
        ("skysports.com", "@SkySports"),
        ("bbci.co.uk", "@BBCSport"),
        ("bbc.co.uk", "@BBCSport"),
        ("theguardian.com", "@GuardianSport"),
    ]
    .into_iter()
    .map(|(pattern, handle)| HandleRule {
        pattern: pattern.to_string(),
        handle: handle.to_string(),
    })
    .collect()
}

fn default_rumor_keywords() -> Vec<String> {
    DEFAULT_RUMOR_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

fn default_max_chars() -> usize {
    280
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_base_url() -> String {
    pitchwire_adapters::x_api::DEFAULT_BASE_URL.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            dry_run: default_true(),
            log_level: default_log_level(),
            dedup_backend: DedupBackend::default(),
            dedup_path: default_dedup_path(),
            retention_days: 0,
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            window_hours: default_window_hours(),
            select_count: default_select_count(),
            min_title_chars: default_min_title_chars(),
            tie_break: TieBreak::default(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            handles: default_handles(),
            default_handle: String::new(),
        }
    }
}

impl Default for RumorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            sources: vec![],
            keywords: default_rumor_keywords(),
            header: None,
        }
    }
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            header: None,
            hashtags: HashtagMode::default(),
            fixed_hashtags: vec![],
            max_chars: default_max_chars(),
            fallback_message: String::new(),
        }
    }
}

impl Default for XWriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            oauth2_user_token_env: default_x_user_token_env(),
            max_chars: default_max_chars(),
            base_url: default_x_base_url(),
        }
    }
}

impl FeedsConfig {
    pub fn handle_map(&self) -> HandleMap {
        HandleMap::new(self.handles.clone(), self.default_handle.clone())
    }
}

impl ComposeConfig {
    pub fn hashtag_policy(&self) -> HashtagPolicy {
        match self.hashtags {
            HashtagMode::Generated => HashtagPolicy::Generated,
            HashtagMode::Fixed => HashtagPolicy::Fixed(self.fixed_hashtags.clone()),
            HashtagMode::Disabled => HashtagPolicy::Disabled,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("PITCHWIRE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r##"# pitchwire configuration

[general]
dry_run = true
log_level = "info"
dedup_backend = "file"  # file, sqlite, memory
dedup_path = "./posted_links.txt"
# Drop posted links older than this many days (sqlite only, 0 keeps forever)
retention_days = 0

[feeds]
sources = [
    "https://www.goal.com/feeds/en/news",
    "https://www.skysports.com/rss/12040",
    "https://feeds.bbci.co.uk/sport/football/rss.xml",
    "https://www.theguardian.com/football/rss",
]
window_hours = 4
select_count = 1
min_title_chars = 20
tie_break = "first"  # first, random
timeout_secs = 15
default_handle = ""

[[feeds.handles]]
pattern = "goal.com"
handle = "@goal"

[[feeds.handles]]
pattern = "skysports.com"
handle = "@SkySports"

[[feeds.handles]]
pattern = "bbci.co.uk"
handle = "@BBCSport"

[[feeds.handles]]
pattern = "bbc.co.uk"
handle = "@BBCSport"

[[feeds.handles]]
pattern = "theguardian.com"
handle = "@GuardianSport"

[rumors]
enabled = true
# Empty reuses feeds.sources
sources = []
keywords = ["transfer", "rumour", "rumor", "bid", "signing", "linked", "deal", "talks", "target"]
# header = "🔥 Transfer Rumours"

[stat]
enabled = false
pages = []

[compose]
# header = "⚽ Football News"
hashtags = "generated"  # generated, fixed, disabled
fixed_hashtags = ["#Football"]
max_chars = 280
# Empty uses the built-in message
fallback_message = ""

[x.write]
enabled = false
oauth2_user_token_env = "X_USER_TOKEN"
max_chars = 280
"##
        .to_string()
    }
}
