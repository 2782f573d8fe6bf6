//! Build and load configuration.
//!
//! Heuristic constants are explicit values handed to the builder. They can
//! come from defaults, a JSON file, or the `BVH_*` / `SAH_*` environment
//! variables.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Parameters of BVH construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Nodes at this depth become leaves regardless of size.
    pub max_depth: u32,
    /// Ranges of at most this many triangles become leaves.
    pub leaf_max: u32,
    /// SAH cost of traversing one node.
    pub traversal_cost: f32,
    /// SAH cost of one ray/triangle test.
    pub intersection_cost: f32,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_depth: 30,
            leaf_max: 10,
            traversal_cost: 1.0,
            intersection_cost: 4.0,
        }
    }
}

impl BuildConfig {
    /// Defaults overridden by `BVH_MAX_DEPTH`, `BVH_LEAF_MAX`, `SAH_CTRAV`
    /// and `SAH_CISEC` when set.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Read a JSON file; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup, then validate.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BVH_MAX_DEPTH") {
            self.max_depth = parse_value("BVH_MAX_DEPTH", &value)?;
            log::info!("BVH max depth set to {}", self.max_depth);
        }
        if let Some(value) = lookup("BVH_LEAF_MAX") {
            self.leaf_max = parse_value("BVH_LEAF_MAX", &value)?;
            log::info!("BVH max objects per leaf set to {}", self.leaf_max);
        }
        if let Some(value) = lookup("SAH_CTRAV") {
            self.traversal_cost = parse_value("SAH_CTRAV", &value)?;
            log::info!("SAH cost of traversal set to {}", self.traversal_cost);
        }
        if let Some(value) = lookup("SAH_CISEC") {
            self.intersection_cost = parse_value("SAH_CISEC", &value)?;
            log::info!("SAH cost of intersection set to {}", self.intersection_cost);
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the builder cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.leaf_max == 0 {
            return Err(invalid("leaf_max", self.leaf_max, "must be at least 1"));
        }
        if !self.traversal_cost.is_finite() || self.traversal_cost < 0.0 {
            return Err(invalid(
                "traversal_cost",
                self.traversal_cost,
                "must be finite and non-negative",
            ));
        }
        if !self.intersection_cost.is_finite() || self.intersection_cost <= 0.0 {
            return Err(invalid(
                "intersection_cost",
                self.intersection_cost,
                "must be finite and positive",
            ));
        }
        Ok(())
    }

    /// SAH cost of leaving `triangle_count` triangles unsplit.
    pub fn leaf_cost(&self, triangle_count: usize) -> f32 {
        self.traversal_cost + self.intersection_cost * triangle_count as f32
    }
}

/// Options applied by the loaders while converting file data to vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Uniform scale applied to every position.
    pub geometry_scale: f32,
    /// When false, file colors are gamma-encoded and get linearized.
    pub colors_are_linear: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            geometry_scale: 1.0,
            colors_are_linear: false,
        }
    }
}

impl LoadOptions {
    /// Defaults overridden by `GEOMETRY_SCALE` and `COLORS_ARE_LINEAR`.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("COLORS_ARE_LINEAR").is_some() {
            self.colors_are_linear = true;
            log::info!("file colors are linear");
        }
        if let Some(value) = lookup("GEOMETRY_SCALE") {
            self.geometry_scale = parse_value("GEOMETRY_SCALE", &value)?;
            if !self.geometry_scale.is_finite() {
                return Err(invalid("GEOMETRY_SCALE", value, "must be finite"));
            }
            log::info!("geometry scale set to {}", self.geometry_scale);
        }
        Ok(self)
    }
}

fn parse_value<T>(name: &'static str, value: &str) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(name, value, e.to_string()))
}

fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_build_config_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.max_depth, 30);
        assert_eq!(config.leaf_max, 10);
        assert_eq!(config.leaf_cost(10), 41.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_config_overrides() {
        let config = BuildConfig::default()
            .with_overrides(lookup_from(&[("BVH_MAX_DEPTH", "19"), ("SAH_CISEC", "2.5")]))
            .unwrap();

        assert_eq!(config.max_depth, 19);
        assert_eq!(config.leaf_max, 10);
        assert_eq!(config.intersection_cost, 2.5);
    }

    #[test]
    fn test_build_config_rejects_garbage() {
        let err = BuildConfig::default()
            .with_overrides(lookup_from(&[("BVH_LEAF_MAX", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "BVH_LEAF_MAX", .. }));

        let err = BuildConfig::default()
            .with_overrides(lookup_from(&[("BVH_LEAF_MAX", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "leaf_max", .. }));
    }

    #[test]
    fn test_build_config_json_partial() {
        let config: BuildConfig = serde_json::from_str(r#"{ "leaf_max": 1 }"#).unwrap();
        assert_eq!(config.leaf_max, 1);
        assert_eq!(config.max_depth, 30);
    }

    #[test]
    fn test_load_options_overrides() {
        let options = LoadOptions::default()
            .with_overrides(lookup_from(&[("COLORS_ARE_LINEAR", ""), ("GEOMETRY_SCALE", "0.5")]))
            .unwrap();

        assert!(options.colors_are_linear);
        assert_eq!(options.geometry_scale, 0.5);
    }
}
