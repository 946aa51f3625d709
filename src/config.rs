use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::detector::{check_unit_interval, DetectionThresholds};
use crate::errors::AppError;
use crate::models::{DedupSettingsOverride, MergePolicy};

/// Thresholds substituted when aggressive mode is on.
pub const AGGRESSIVE_THRESHOLDS: DetectionThresholds = DetectionThresholds {
    email_threshold: 0.85,
    name_threshold: 0.80,
    confidence_min: 0.65,
};

/// Deduplication knobs shared by the server defaults and per-request overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupSettings {
    pub email_threshold: f64,
    pub name_threshold: f64,
    pub confidence_min: f64,
    pub aggressive_mode: bool,
    pub merge_policy: MergePolicy,
    pub passes: usize,
    pub merge_compound_names: bool,
}

impl Default for DedupSettings {
    fn default() -> Self {
        let thresholds = DetectionThresholds::default();
        Self {
            email_threshold: thresholds.email_threshold,
            name_threshold: thresholds.name_threshold,
            confidence_min: thresholds.confidence_min,
            aggressive_mode: false,
            merge_policy: MergePolicy::Pairwise,
            passes: 1,
            merge_compound_names: false,
        }
    }
}

impl DedupSettings {
    /// Rejects out-of-range values; nothing is clamped.
    pub fn validate(&self) -> Result<(), AppError> {
        check_unit_interval("email_threshold", self.email_threshold)?;
        check_unit_interval("name_threshold", self.name_threshold)?;
        check_unit_interval("confidence_min", self.confidence_min)?;
        if self.passes == 0 {
            return Err(AppError::InvalidConfig(
                "passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Thresholds the detector runs with.
    pub fn thresholds(&self) -> Result<DetectionThresholds, AppError> {
        self.validate()?;
        if self.aggressive_mode {
            Ok(AGGRESSIVE_THRESHOLDS)
        } else {
            DetectionThresholds::new(self.email_threshold, self.name_threshold, self.confidence_min)
        }
    }

    /// Copy with every field the override sets replaced, then validated.
    pub fn apply_override(&self, over: &DedupSettingsOverride) -> Result<Self, AppError> {
        let settings = Self {
            email_threshold: over.email_threshold.unwrap_or(self.email_threshold),
            name_threshold: over.name_threshold.unwrap_or(self.name_threshold),
            confidence_min: over.confidence_min.unwrap_or(self.confidence_min),
            aggressive_mode: over.aggressive_mode.unwrap_or(self.aggressive_mode),
            merge_policy: over.merge_policy.unwrap_or(self.merge_policy),
            passes: over.passes.unwrap_or(self.passes),
            merge_compound_names: over
                .merge_compound_names
                .unwrap_or(self.merge_compound_names),
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub lookup_tables_path: Option<String>,
    pub max_records: usize,
    pub run_cache_ttl_secs: u64,
    pub run_cache_capacity: u64,
    pub dedup: DedupSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            lookup_tables_path: None,
            max_records: 10_000,
            run_cache_ttl_secs: 3600,
            run_cache_capacity: 1000,
            dedup: DedupSettings::default(),
        }
    }
}

/// Parses `key` from the environment, falling back to `default` when unset.
fn env_parse<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: {}", key, raw)),
        _ => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            lookup_tables_path: std::env::var("LOOKUP_TABLES_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            max_records: env_parse("MAX_RECORDS", defaults.max_records).and_then(|max| {
                if max == 0 {
                    anyhow::bail!("MAX_RECORDS must be at least 1");
                }
                Ok(max)
            })?,
            run_cache_ttl_secs: env_parse("RUN_CACHE_TTL_SECS", defaults.run_cache_ttl_secs)?,
            run_cache_capacity: env_parse("RUN_CACHE_CAPACITY", defaults.run_cache_capacity)?,
            dedup: DedupSettings {
                email_threshold: env_parse("EMAIL_THRESHOLD", defaults.dedup.email_threshold)?,
                name_threshold: env_parse("NAME_THRESHOLD", defaults.dedup.name_threshold)?,
                confidence_min: env_parse("CONFIDENCE_MIN", defaults.dedup.confidence_min)?,
                aggressive_mode: env_parse("AGGRESSIVE_MODE", defaults.dedup.aggressive_mode)?,
                merge_policy: std::env::var("MERGE_POLICY")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(|raw| raw.parse::<MergePolicy>().map_err(anyhow::Error::msg))
                    .transpose()?
                    .unwrap_or_default(),
                passes: env_parse("DEDUP_PASSES", defaults.dedup.passes)?,
                merge_compound_names: env_parse(
                    "MERGE_COMPOUND_NAMES",
                    defaults.dedup.merge_compound_names,
                )?,
            },
        };

        config
            .dedup
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid deduplication settings: {}", e))?;

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Server Port: {}", config.port);
        match &config.lookup_tables_path {
            Some(path) => tracing::info!("Lookup tables file: {}", path),
            None => tracing::debug!("Lookup tables: built-in"),
        }
        tracing::debug!(
            "Max records per request: {}, run cache: {} entries for {}s",
            config.max_records,
            config.run_cache_capacity,
            config.run_cache_ttl_secs
        );
        tracing::debug!(
            "Dedup: email {:.2}, name {:.2}, confidence {:.2}, aggressive {}, policy {}, passes {}",
            config.dedup.email_threshold,
            config.dedup.name_threshold,
            config.dedup.confidence_min,
            config.dedup.aggressive_mode,
            config.dedup.merge_policy.as_str(),
            config.dedup.passes
        );

        Ok(config)
    }
}
