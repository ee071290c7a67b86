//! Process configuration read once from the environment.

use anyhow::{Context, bail};
use chrono::FixedOffset;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::rating::SelectionRule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    Orion,
    Fixture,
}

impl FromStr for DataSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "orion" => Ok(DataSourceKind::Orion),
            "fixture" => Ok(DataSourceKind::Fixture),
            other => bail!("expected 'orion' or 'fixture', got '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub orion_uri: String,
    pub fiware_service: Option<String>,
    pub fiware_service_path: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub data_source: DataSourceKind,
    pub fixture_path: Option<PathBuf>,
    /// Offset timestamps are rendered in for memos and per-record rows.
    pub display_offset: FixedOffset,
    pub selection_rule: SelectionRule,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Missing keys fall back
    /// to defaults; present but malformed values are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_source: DataSourceKind = try_load(&lookup, "DATA_SOURCE", "orion")?;
        let fixture_path = lookup("FIXTURE_PATH").map(PathBuf::from);
        if data_source == DataSourceKind::Fixture && fixture_path.is_none() {
            bail!("FIXTURE_PATH must be set when DATA_SOURCE=fixture");
        }

        Ok(Self {
            orion_uri: try_load(&lookup, "ORION_URI", "http://localhost:1026")?,
            fiware_service: lookup("ORION_FIWARE_SERVICE").filter(|s| !s.is_empty()),
            fiware_service_path: try_load(&lookup, "ORION_FIWARE_SERVICE_PATH", "/")?,
            timeout: Duration::from_secs(try_load(&lookup, "ORION_TIMEOUT_SECS", "30")?),
            connect_timeout: Duration::from_secs(try_load(
                &lookup,
                "ORION_CONNECT_TIMEOUT_SECS",
                "10",
            )?),
            data_source,
            fixture_path,
            display_offset: try_load(&lookup, "DISPLAY_UTC_OFFSET", "+09:00")?,
            selection_rule: try_load(&lookup, "HAPPINESS_SELECTION_RULE", "at-least-one")?,
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: &str,
) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Invalid {key} value '{raw}'"))
}
