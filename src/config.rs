//! Site configuration module.
//!
//! Handles loading and validating `quire.toml` from the content root. The
//! file is required: a site without a title, base URL, or date format cannot
//! be built, so a missing file or key is a fatal error at startup.
//!
//! ## Config File Location
//!
//! ```text
//! content/
//! ├── quire.toml               # Site configuration (required)
//! ├── blog/
//! │   └── 2026/
//! │       ├── post-one.adoc
//! │       └── images/
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [site]
//! title = "My Blog"                   # required
//! description = "Notes and essays"    # required
//! base_url = "https://example.com"    # required, trailing slash stripped
//! language = "en"                     # required
//! date_format = "%Y-%m-%d"            # required, chrono strftime pattern
//! timezone = "Europe/Zurich"          # optional, IANA name for feed dates
//!
//! [dev]
//! port = 8080                         # optional
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the site configuration, at the content root.
pub const CONFIG_FILE_NAME: &str = "quire.toml";

/// Zone for feed timestamps when `[site] timezone` is not set.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Zurich;

/// Dev server port when `[dev] port` is not set.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required config file: {}", .0.display())]
    Missing(PathBuf),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `quire.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    pub site: SiteSection,
    #[serde(default)]
    pub dev: DevConfig,
}

/// The `[site]` table. Every key except `timezone` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    pub title: String,
    pub description: String,
    /// Absolute site root without a trailing slash, e.g. `https://example.com/blog`.
    pub base_url: String,
    /// Language tag written into `<html lang>` and the feed.
    pub language: String,
    /// `chrono` strftime pattern for dates shown on pages.
    pub date_format: String,
    /// IANA zone name used for feed timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.name().to_string()
}

/// The `[dev]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevConfig {
    pub port: u16,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl SiteConfig {
    /// Parse config text, normalize it, and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: SiteConfig = toml::from_str(content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Trim every value and strip trailing slashes from `base_url`.
    fn normalize(&mut self) {
        let site = &mut self.site;
        for value in [
            &mut site.title,
            &mut site.description,
            &mut site.language,
            &mut site.date_format,
            &mut site.timezone,
        ] {
            *value = value.trim().to_string();
        }
        site.base_url = site.base_url.trim().trim_end_matches('/').to_string();
    }

    /// Validate that required values are present and the date format is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let site = &self.site;
        for (key, value) in [
            ("site.title", &site.title),
            ("site.description", &site.description),
            ("site.base_url", &site.base_url),
            ("site.language", &site.language),
            ("site.date_format", &site.date_format),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "missing required config key: {key}"
                )));
            }
        }
        if StrftimeItems::new(&site.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Validation(format!(
                "site.date_format is not a valid strftime pattern: '{}'",
                site.date_format
            )));
        }
        if site.timezone.parse::<Tz>().is_err() {
            return Err(ConfigError::Validation(format!(
                "site.timezone is not a known time zone: '{}'",
                site.timezone
            )));
        }
        Ok(())
    }

    /// Zone for feed timestamps. Validation guarantees the name parses.
    pub fn timezone(&self) -> Tz {
        self.site.timezone.parse().unwrap_or(DEFAULT_TIMEZONE)
    }

    /// Absolute URL for a site path. `http(s)://` URLs pass through unchanged.
    pub fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{}", self.site.base_url, path)
        } else {
            format!("{}/{}", self.site.base_url, path)
        }
    }

    /// Date as shown on pages, in the configured format.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let mut out = String::new();
        match write!(out, "{}", date.format(&self.site.date_format)) {
            Ok(()) => out,
            Err(_) => date.to_string(),
        }
    }
}

/// Load `quire.toml` from the given content root.
///
/// A missing file, an unknown key, or a blank required value is an error.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.is_file() {
        return Err(ConfigError::Missing(config_path));
    }
    let content = fs::read_to_string(&config_path)?;
    SiteConfig::from_toml(&content)
}

/// Whether `relative` (relative to the content root) is the site config file.
pub fn is_config_file(relative: &Path) -> bool {
    relative == Path::new(CONFIG_FILE_NAME)
}

/// Returns a fully-commented stock `quire.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quire Configuration
# ===================
# Place this file as quire.toml at the root of your content directory.
# Every key in [site] is required. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Site
# ---------------------------------------------------------------------------
[site]
# Shown in the navbar, page titles and the feed channel.
title = "My Blog"

# Feed channel description.
description = "Notes and essays"

# Absolute URL the site is published under. A trailing slash is removed.
# Feed links and the search index are built from it.
base_url = "https://example.com"

# Language tag for <html lang> and the feed.
language = "en"

# How post dates are shown on pages (chrono strftime syntax).
# Examples: "%Y-%m-%d", "%d.%m.%Y", "%B %-d, %Y"
date_format = "%Y-%m-%d"

# Time zone (IANA name) for feed timestamps. A post dated 2026-01-12 is
# published at midnight in this zone.
timezone = "Europe/Zurich"

# ---------------------------------------------------------------------------
# Development server
# ---------------------------------------------------------------------------
[dev]
# Port used by `quire serve` unless --port is given.
port = 8080
"##
}
