//! Tree construction settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Error, Result};

/// Tunables shared by the BVH and k-d tree builders.
///
/// Missing fields in a settings file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// SAH cost of intersecting one primitive.
    pub intersect_cost: f32,
    /// SAH cost of descending through one internal node.
    pub traversal_cost: f32,
    /// Sub-builds over fewer elements than this run inline instead of forking.
    pub parallel_threshold: usize,
    /// Sorts over more elements than this use the parallel sort.
    pub parallel_sort_threshold: usize,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            intersect_cost: 1.0,
            traversal_cost: 1.0,
            parallel_threshold: 1000,
            parallel_sort_threshold: 10_000,
        }
    }
}

impl BuildSettings {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let mut settings: Self = serde_json::from_str(&text)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is absent or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(Error::FileNotFound(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring settings file {}: {e}", path.as_ref().display());
                Self::default()
            }
        }
    }

    /// Save settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Should a sub-build over `count` elements fork?
    #[inline]
    pub fn should_fork(&self, count: usize) -> bool {
        count >= self.parallel_threshold
    }

    /// Should a sort over `count` elements run in parallel?
    #[inline]
    pub fn should_sort_parallel(&self, count: usize) -> bool {
        count > self.parallel_sort_threshold
    }

    fn sanitize(&mut self) {
        // Non-positive costs make every split look free.
        if !(self.intersect_cost > 0.0) {
            self.intersect_cost = 1.0;
        }
        if !(self.traversal_cost >= 0.0) {
            self.traversal_cost = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "intersect_cost": 2.5 }"#).unwrap();

        let settings = BuildSettings::load(&path).unwrap();
        assert_eq!(settings.intersect_cost, 2.5);
        assert_eq!(settings.traversal_cost, 1.0);
        assert_eq!(settings.parallel_threshold, 1000);
    }

    #[test]
    fn test_missing_file() {
        let err = BuildSettings::load("/nonexistent/lumen.json").unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
        assert_eq!(
            BuildSettings::load_or_default("/nonexistent/lumen.json"),
            BuildSettings::default()
        );
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = BuildSettings {
            parallel_threshold: 64,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(BuildSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_sanitize_costs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "intersect_cost": -1.0 }"#).unwrap();
        assert_eq!(BuildSettings::load(&path).unwrap().intersect_cost, 1.0);
    }
}
