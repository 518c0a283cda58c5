//! Doctor command - validate configuration and show status

use anyhow::Result;
use pitchwire_adapters::store::{FileLinkStore, SqliteLinkStore};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::config::{AppConfig, DedupBackend};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    feeds: CheckResult,
    fallbacks: CheckResult,
    store: CheckResult,
    x_write: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        feeds: CheckResult::error("Not checked"),
        fallbacks: CheckResult::error("Not checked"),
        store: CheckResult::error("Not checked"),
        x_write: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.feeds = check_feeds(config);
        report.fallbacks = check_fallbacks(config);
        report.store = check_store(config).await;
        report.x_write = check_x_write(config);
    }

    let checks = [
        &report.config,
        &report.feeds,
        &report.fallbacks,
        &report.store,
        &report.x_write,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_feeds(config: &AppConfig) -> CheckResult {
    let sources = &config.feeds.sources;
    if sources.is_empty() {
        return CheckResult::warn("No feed sources configured; only fallbacks will post");
    }

    let invalid = invalid_urls(sources);
    if !invalid.is_empty() {
        return CheckResult::error(format!("{} invalid feed URL(s)", invalid.len()))
            .with_details(serde_json::json!({ "invalid": invalid }));
    }

    if config.feeds.select_count == 0 {
        return CheckResult::warn("select_count is 0; primary feeds never post");
    }

    let handles = config.feeds.handle_map();
    let resolved: Vec<_> = sources
        .iter()
        .map(|url| serde_json::json!({ "url": url, "handle": handles.resolve(url) }))
        .collect();

    CheckResult::ok(format!(
        "{} sources, window {}h, select {}",
        sources.len(),
        config.feeds.window_hours,
        config.feeds.select_count
    ))
    .with_details(serde_json::json!({ "sources": resolved }))
}

fn check_fallbacks(config: &AppConfig) -> CheckResult {
    let mut chain = Vec::new();
    if config.rumors.enabled {
        chain.push("rumor_digest");
    }
    if config.stat.enabled {
        if config.stat.pages.is_empty() {
            return CheckResult::warn("Stat of the day enabled but no pages configured");
        }
        let invalid = invalid_urls(&config.stat.pages);
        if !invalid.is_empty() {
            return CheckResult::error(format!("{} invalid stat page URL(s)", invalid.len()))
                .with_details(serde_json::json!({ "invalid": invalid }));
        }
        chain.push("stat_of_the_day");
    }
    chain.push("static_message");

    CheckResult::ok(format!("Chain: {}", chain.join(" -> ")))
}

async fn check_store(config: &AppConfig) -> CheckResult {
    let path = &config.general.dedup_path;

    match config.general.dedup_backend {
        DedupBackend::Memory => {
            CheckResult::warn("In-memory dedup store: posts may repeat across runs")
        }
        DedupBackend::File if !path.exists() => new_store_warning(path),
        DedupBackend::File => match FileLinkStore::open(path.clone()).await {
            Ok(store) => CheckResult::ok(format!(
                "File store {}: {} links",
                path.display(),
                store.len()
            )),
            Err(e) => CheckResult::error(format!("Failed to open {}: {}", path.display(), e)),
        },
        DedupBackend::Sqlite if !path.exists() => new_store_warning(path),
        DedupBackend::Sqlite => {
            let opened = SqliteLinkStore::new(path).await;
            match opened {
                Ok(store) => match store.count().await {
                    Ok(count) => CheckResult::ok(format!(
                        "SQLite store {}: {} links",
                        path.display(),
                        count
                    ))
                    .with_details(serde_json::json!({
                        "retention_days": config.general.retention_days
                    })),
                    Err(e) => CheckResult::error(format!("Failed to query store: {}", e)),
                },
                Err(e) => CheckResult::error(format!("Failed to open {}: {}", path.display(), e)),
            }
        }
    }
}

fn new_store_warning(path: &Path) -> CheckResult {
    CheckResult::warn(format!(
        "Dedup store {} does not exist yet; it will be created on first run",
        path.display()
    ))
}

fn check_x_write(config: &AppConfig) -> CheckResult {
    if !config.x.write.enabled {
        return CheckResult::ok("X write disabled");
    }

    let env_var = &config.x.write.oauth2_user_token_env;

    if env_var.is_empty() {
        return CheckResult::error("No user token env var configured");
    }

    match std::env::var(env_var) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "User token: {} (set), max chars: {}",
            env_var, config.x.write.max_chars
        )),
        _ => CheckResult::warn(format!(
            "User token: {} (not set), max chars: {}",
            env_var, config.x.write.max_chars
        )),
    }
}

fn invalid_urls(urls: &[String]) -> Vec<&str> {
    urls.iter()
        .map(String::as_str)
        .filter(|u| {
            !url::Url::parse(u.trim())
                .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
                .unwrap_or(false)
        })
        .collect()
}

fn print_report(report: &DoctorReport) {
    println!("pitchwire Doctor Report");
    println!("=======================");
    println!();

    print_check("Config", &report.config);
    print_check("Feeds", &report.feeds);
    print_check("Fallbacks", &report.fallbacks);
    print_check("Dedup Store", &report.store);
    print_check("X Write", &report.x_write);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: pitchwire run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
