//! Configuration
//!
//! CLI arguments and environment variables via clap, converted into the
//! plain [`EngineConfig`] the library consumes.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::content::{KeyAliases, DEFAULT_KEY_PREFIXES};
use crate::dropdown::DropdownMode;
use crate::fetch::DEFAULT_FETCH_TIMEOUT;
use crate::language::{is_supported, SUPPORTED_LANGUAGES};

/// Localized form content and dropdown resolution
#[derive(Parser, Debug, Clone)]
#[command(name = "bankim-content")]
#[command(about = "Resolve screen content and dropdown data from the content service")]
pub struct Args {
    /// Base URL of the content service
    #[arg(long, env = "CONTENT_API_URL", default_value = "http://localhost:8003")]
    pub api_url: String,

    /// Active language (en, he, ru)
    #[arg(long, env = "CONTENT_LANGUAGE", default_value = "he")]
    pub language: String,

    /// Language for static translation fallback
    #[arg(long, env = "CONTENT_FALLBACK_LANGUAGE", default_value = "en")]
    pub fallback_language: String,

    /// Directory of static translations (`<lang>/translation.json`)
    #[arg(long, env = "TRANSLATIONS_DIR")]
    pub translations_dir: Option<PathBuf>,

    /// Bound on a single fetch, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "10000")]
    pub request_timeout_ms: u64,

    /// Dropdown cache lifetime in seconds; unset keeps dropdowns for the session
    #[arg(long, env = "DROPDOWN_TTL_SECS")]
    pub dropdown_ttl_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve content keys of a screen (whole bundle as JSON without --key)
    Content {
        /// Screen location, e.g. mortgage_step1
        screen: String,

        /// Key to resolve (repeatable)
        #[arg(short, long = "key")]
        keys: Vec<String>,

        /// Literal fallback for every key
        #[arg(short, long)]
        fallback: Option<String>,
    },

    /// Resolve one dropdown field of a screen
    Dropdown {
        screen: String,

        /// Logical field name, e.g. obligations
        field: String,

        /// full or options
        #[arg(short, long, default_value = "full")]
        mode: DropdownMode,

        /// Option value to leave out (repeatable)
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,
    },

    /// Show the logical field → remote key table of a screen
    Fields { screen: String },
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("CONTENT_API_URL must not be empty".to_string());
        }

        for (name, code) in [("CONTENT_LANGUAGE", &self.language), ("CONTENT_FALLBACK_LANGUAGE", &self.fallback_language)] {
            if !is_supported(code) {
                return Err(format!(
                    "{} '{}' is not supported (expected one of {})",
                    name,
                    code,
                    SUPPORTED_LANGUAGES.join(", ")
                ));
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Engine settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub default_language: String,
    pub fallback_language: Option<String>,
    pub translations_dir: Option<PathBuf>,
    pub request_timeout: Duration,
    /// `None` keeps dropdown bundles for the session
    pub dropdown_ttl: Option<Duration>,
    /// Prefixes tried for a key within the remote content bundle
    pub key_prefixes: Vec<String>,
    /// Legacy keys mapped to the remote keys that replaced them
    pub key_aliases: KeyAliases,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8003".to_string(),
            default_language: "he".to_string(),
            fallback_language: Some("en".to_string()),
            translations_dir: None,
            request_timeout: DEFAULT_FETCH_TIMEOUT,
            dropdown_ttl: None,
            key_prefixes: DEFAULT_KEY_PREFIXES.iter().map(|p| p.to_string()).collect(),
            key_aliases: KeyAliases::built_in(),
        }
    }
}

impl EngineConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            api_base_url: args.api_url.clone(),
            default_language: args.language.clone(),
            fallback_language: Some(args.fallback_language.clone()),
            translations_dir: args.translations_dir.clone(),
            request_timeout: args.request_timeout(),
            dropdown_ttl: args.dropdown_ttl_secs.map(Duration::from_secs),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["bankim-content", "fields", "mortgage_step1"]);
        assert_eq!(args.api_url, "http://localhost:8003");
        assert_eq!(args.request_timeout(), Duration::from_secs(10));
        assert!(args.validate().is_ok());

        let config = EngineConfig::from_args(&args);
        assert_eq!(config.default_language, "he");
        assert_eq!(config.key_prefixes.len(), DEFAULT_KEY_PREFIXES.len());
        assert!(config.key_prefixes.iter().any(|p| p == "app.home.navigation."));
        assert_eq!(config.key_aliases.get("calculate_mortgage_education"), ["app.mortgage.step2.education"]);
        assert!(config.dropdown_ttl.is_none());
    }

    #[test]
    fn test_dropdown_subcommand() {
        let args = parse(&[
            "bankim-content",
            "--dropdown-ttl-secs",
            "300",
            "dropdown",
            "credit_step3",
            "additional_income",
            "--mode",
            "options",
            "--exclude",
            "no_additional_income",
        ]);
        match &args.command {
            Command::Dropdown { mode, exclude, .. } => {
                assert_eq!(*mode, DropdownMode::Options);
                assert_eq!(exclude, &vec!["no_additional_income".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(
            EngineConfig::from_args(&args).dropdown_ttl,
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut args = parse(&["bankim-content", "fields", "x"]);
        args.language = "fr".into();
        assert!(args.validate().unwrap_err().contains("CONTENT_LANGUAGE 'fr'"));

        let mut args = parse(&["bankim-content", "fields", "x"]);
        args.request_timeout_ms = 0;
        assert!(args.validate().is_err());

        let mut args = parse(&["bankim-content", "fields", "x"]);
        args.api_url = " ".into();
        assert!(args.validate().is_err());
    }
}
