//! Store configuration.
//!
//! Mirrors the teacher's `jetty::JettyConfig`: environment first, an
//! optional yaml config file second, hardcoded defaults last.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use dirs::home_dir;
use serde::Deserialize;
use yaml_peg::serde as yaml;

const DB_LOCATION_VAR: &str = "PROVENANCE_DB_LOCATION";
const DEFAULT_DB_DIRNAME: &str = "provenance.db";

/// Default cap on nodes returned by the text query interface (spec §6).
pub const DEFAULT_QUERY_LIMIT: usize = 500;
/// Default cap on `getActors`/`listWorkflows`-style listings when the
/// caller passes a non-positive limit (spec §7: clamped, not an error).
pub const DEFAULT_LIST_LIMIT: usize = 100;
/// Bound on the transitive-closure path length used by `dominates`
/// (spec §3 invariant 5, §4.5).
pub const DOMINANCE_PATH_BOUND: usize = 100;

/// Optional on-disk overrides for the defaults above, read from
/// `./provenance_config.yaml` if present. Every field is optional; a
/// missing file or missing field falls back silently to the hardcoded
/// constant.
#[derive(Deserialize, Default, Debug)]
pub struct GraphConfigFile {
    /// Override for [`DEFAULT_QUERY_LIMIT`].
    pub query_limit: Option<usize>,
    /// Override for [`DEFAULT_LIST_LIMIT`].
    pub list_limit: Option<usize>,
}

/// Resolved configuration for a [`crate::store::GraphStore`].
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Directory the graph kernel persists into.
    pub db_location: PathBuf,
    /// Cap on `query()` results.
    pub query_limit: usize,
    /// Cap on listing operations passed a non-positive limit.
    pub list_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            db_location: default_db_location(),
            query_limit: DEFAULT_QUERY_LIMIT,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl GraphConfig {
    /// Resolve configuration from the environment and an optional
    /// `./provenance_config.yaml`, overlaying hardcoded defaults.
    pub fn load() -> Result<Self> {
        let mut config = GraphConfig::default();

        if let Ok(raw) = fs::read_to_string("./provenance_config.yaml") {
            let mut parsed = yaml::from_str::<GraphConfigFile>(&raw)?;
            if let Some(file) = parsed.pop() {
                if let Some(limit) = file.query_limit {
                    config.query_limit = clamp_limit(limit, DEFAULT_QUERY_LIMIT);
                }
                if let Some(limit) = file.list_limit {
                    config.list_limit = clamp_limit(limit, DEFAULT_LIST_LIMIT);
                }
            }
        }

        Ok(config)
    }
}

/// Clamp a caller-supplied limit to a default when zero or negative
/// (spec §7: "limits are silently clamped to defaults, not an error").
pub fn clamp_limit(requested: usize, default: usize) -> usize {
    if requested == 0 {
        default
    } else {
        requested
    }
}

/// Clamp a signed limit (as it arrives from callers who may pass `<= 0`
/// to mean "unbounded" or "use the default", per spec §4.6/§7).
pub fn clamp_signed_limit(requested: i64, default: usize) -> usize {
    if requested <= 0 {
        default
    } else {
        requested as usize
    }
}

fn default_db_location() -> PathBuf {
    if let Ok(path) = env::var(DB_LOCATION_VAR) {
        return PathBuf::from(path);
    }
    let mut home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.push(DEFAULT_DB_DIRNAME);
    home
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_falls_back_on_zero() {
        assert_eq!(clamp_limit(0, 500), 500);
        assert_eq!(clamp_limit(10, 500), 10);
    }

    #[test]
    fn clamp_signed_limit_treats_negative_as_default() {
        assert_eq!(clamp_signed_limit(-1, 100), 100);
        assert_eq!(clamp_signed_limit(0, 100), 100);
        assert_eq!(clamp_signed_limit(5, 100), 5);
    }
}
