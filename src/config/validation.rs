use crate::config::locales::is_iso_639_1;
use crate::config::types::{Config, CrawlerConfig, LogLevel, LoggingConfig};
use crate::storage::{CheckpointStore, JsonPageStore};
use crate::{ConfigError, ConfigResult};
use std::path::Path;
use url::Url;

/// Smallest accepted timeout in milliseconds
const MIN_TIMEOUT_MS: u64 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    for (name, value) in [
        ("navigation-timeout-ms", config.navigation_timeout_ms),
        ("load-timeout-ms", config.load_timeout_ms),
        ("grace-timeout-ms", config.grace_timeout_ms),
    ] {
        if value < MIN_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "{} must be >= {}ms, got {}ms",
                name, MIN_TIMEOUT_MS, value
            )));
        }
    }

    validate_patterns(&config.patterns)
}

/// Validates logging configuration
fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    config
        .level
        .parse::<LogLevel>()
        .map(|_| ())
        .map_err(ConfigError::Validation)
}

/// Validates the list of locales to crawl
///
/// Locales must be lowercase ISO 639-1 codes and may not repeat.
pub fn validate_locales(locales: &[String]) -> ConfigResult<()> {
    if locales.is_empty() {
        return Err(ConfigError::Validation(
            "at least one locale is required".to_string(),
        ));
    }

    for (i, locale) in locales.iter().enumerate() {
        if !is_iso_639_1(locale) {
            return Err(ConfigError::InvalidLocale(format!(
                "'{}' is not an ISO 639-1 language code",
                locale
            )));
        }
        if locales[..i].contains(locale) {
            return Err(ConfigError::InvalidLocale(format!(
                "'{}' is listed more than once",
                locale
            )));
        }
    }

    Ok(())
}

/// Validates seed URLs: at least one, all http(s) with a host
pub fn validate_seeds(seeds: &[String]) -> ConfigResult<()> {
    if seeds.is_empty() {
        return Err(ConfigError::Validation(
            "at least one seed URL is required".to_string(),
        ));
    }

    for seed in seeds {
        let url = Url::parse(seed.trim())
            .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "'{}' must use http or https",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!("'{}' has no host", seed)));
        }
    }

    Ok(())
}

/// Validates URL patterns: every pattern must be a non-empty string
pub fn validate_patterns(patterns: &[String]) -> ConfigResult<()> {
    if patterns.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidPattern(
            "patterns cannot contain empty strings".to_string(),
        ));
    }
    Ok(())
}

/// Validates that the destination exists as a directory or can be created
///
/// A missing destination is accepted when its nearest existing ancestor is a
/// writable directory.
pub fn validate_destination(destination: &Path) -> ConfigResult<()> {
    if destination.exists() {
        return if destination.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::InvalidDestination(destination.to_path_buf()))
        };
    }

    let ancestor = destination
        .ancestors()
        .skip(1)
        .find(|p| p.as_os_str().is_empty() || p.exists());

    let writable = match ancestor {
        // Relative path whose first component is missing: resolves against the cwd
        Some(p) if p.as_os_str().is_empty() => true,
        Some(p) => std::fs::metadata(p)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false),
        None => false,
    };

    if writable {
        Ok(())
    } else {
        Err(ConfigError::InvalidDestination(destination.to_path_buf()))
    }
}

/// Validates the destination of a new crawl or download
///
/// On top of [`validate_destination`], the directory must not hold a checkpoint or
/// stored pages, since a new run numbers its pages from 1 again.
pub fn validate_fresh_destination(destination: &Path) -> ConfigResult<()> {
    validate_destination(destination)?;

    let has_records = JsonPageStore::new(destination)
        .has_records()
        .map_err(|_| ConfigError::InvalidDestination(destination.to_path_buf()))?;

    if has_records || CheckpointStore::in_dir(destination).exists() {
        return Err(ConfigError::DestinationInUse(destination.to_path_buf()));
    }
    Ok(())
}
