//! Migration configuration module.
//!
//! Handles loading, validating, and merging `wp2mdx.toml`. Stock defaults
//! are overridden by the user file, which is in turn overridden by CLI
//! flags for the three input/output paths.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! export_path = "export.xml"     # WordPress WXR export
//! images_dir = "images"          # Flat directory of downloaded media
//! content_dir = "content"        # Root of generated artifacts
//! publish_dir = "public/images"  # Media copied here for serving ("" = skip)
//!
//! [site]
//! domain = "drmatildaevansfoundation.org"
//! home_slug = "home"
//! post_route = "/dr-evans-academy"
//! media_prefix = "/images"
//! uploads_marker = "/wp-content/uploads/"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [site]
//! domain = "example.org"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Migration configuration loaded from `wp2mdx.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    /// WordPress WXR export file.
    pub export_path: String,
    /// Flat directory of media downloaded from the old site.
    pub images_dir: String,
    /// Root directory for generated documents, data and reports.
    pub content_dir: String,
    /// Directory the serving layer maps `media_prefix` to. Empty disables copying.
    pub publish_dir: String,
    /// Site-specific URL conventions.
    pub site: SiteConfig,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            export_path: "export.xml".to_string(),
            images_dir: "images".to_string(),
            content_dir: "content".to_string(),
            publish_dir: "public/images".to_string(),
            site: SiteConfig::default(),
        }
    }
}

/// URL conventions of the old site and the new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Links containing this host are internal.
    pub domain: String,
    /// Page slug served at `/`.
    pub home_slug: String,
    /// URL prefix under which posts are served.
    pub post_route: String,
    /// Path prefix under which local media is served.
    pub media_prefix: String,
    /// Substring identifying URLs of the original upload location.
    pub uploads_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: "drmatildaevansfoundation.org".to_string(),
            home_slug: "home".to_string(),
            post_route: "/dr-evans-academy".to_string(),
            media_prefix: "/images".to_string(),
            uploads_marker: "/wp-content/uploads/".to_string(),
        }
    }
}

impl SiteConfig {
    /// `media_prefix` joined with a local filename.
    pub fn media_path(&self, file: &str) -> String {
        format!("{}/{}", self.media_prefix.trim_end_matches('/'), file)
    }

    /// Site URL of a post.
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/{}", self.post_route.trim_end_matches('/'), slug)
    }
}

impl MigrateConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("export_path", &self.export_path),
            ("images_dir", &self.images_dir),
            ("content_dir", &self.content_dir),
            ("site.domain", &self.site.domain),
            ("site.uploads_marker", &self.site.uploads_marker),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        for (key, value) in [
            ("site.media_prefix", &self.site.media_prefix),
            ("site.post_route", &self.site.post_route),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::Validation(format!("{key} must start with '/'")));
            }
        }
        Ok(())
    }

    pub fn export_path(&self) -> PathBuf {
        PathBuf::from(&self.export_path)
    }

    pub fn images_dir(&self) -> PathBuf {
        PathBuf::from(&self.images_dir)
    }

    pub fn content_dir(&self) -> PathBuf {
        PathBuf::from(&self.content_dir)
    }

    pub fn publish_dir(&self) -> Option<PathBuf> {
        (!self.publish_dir.trim().is_empty()).then(|| PathBuf::from(&self.publish_dir))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(MigrateConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<MigrateConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: MigrateConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when absent.
pub fn load_config(path: &Path) -> Result<MigrateConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `wp2mdx.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# wp2mdx Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# WordPress export file (Tools -> Export -> All content).
export_path = "export.xml"

# Flat directory holding the media downloaded from the old site.
images_dir = "images"

# Generated pages/, posts/, data/ and reports are written here.
content_dir = "content"

# Every file of images_dir is copied here so media_prefix resolves when
# the site is served. Set to "" to skip copying.
publish_dir = "public/images"

# ---------------------------------------------------------------------------
# Site URL conventions
# ---------------------------------------------------------------------------
[site]
# Absolute links containing this domain are internal; all others are
# listed in the migration report for review.
domain = "drmatildaevansfoundation.org"

# Page slug served at "/" in the menu.
home_slug = "home"

# URL prefix under which posts are served.
post_route = "/dr-evans-academy"

# Path prefix rewritten media references point at.
media_prefix = "/images"

# Only URLs containing this marker are treated as uploaded media.
uploads_marker = "/wp-content/uploads/"
"##
}
