use anyhow::{ensure, Context, Result};
use facematch_vision::{DetectorParams, SelectionStrategy};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(
        option_env!("FACEMATCH_CONFIG_PATH").unwrap_or("/usr/local/etc/facematch/config.toml"),
    )
});

pub const DEFAULT_CASCADE_PATH: &str =
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml";

pub const MATCH_THRESHOLD_ENV: &str = "MATCH_THRESHOLD";
pub const CONFIDENCE_MAX_DISTANCE_ENV: &str = "CONFIDENCE_MAX_DISTANCE";
pub const CASCADE_PATH_ENV: &str = "FACE_CASCADE_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Distances strictly below this count as a match.
    pub match_threshold: f64,
    /// Distance at which confidence reaches 0%.
    pub confidence_max_distance: f64,
    /// OpenCV Haar cascade XML.
    pub cascade: PathBuf,
    pub selection: SelectionStrategy,
    pub detector: DetectorParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            match_threshold: 25.0,
            confidence_max_distance: 40.0,
            cascade: PathBuf::from(DEFAULT_CASCADE_PATH),
            selection: SelectionStrategy::default(),
            detector: DetectorParams::default(),
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment-style overrides; `lookup` returns the value of a variable if set.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(raw) = lookup(MATCH_THRESHOLD_ENV) {
            self.match_threshold = parse_float(MATCH_THRESHOLD_ENV, &raw)?;
        }
        if let Some(raw) = lookup(CONFIDENCE_MAX_DISTANCE_ENV) {
            self.confidence_max_distance = parse_float(CONFIDENCE_MAX_DISTANCE_ENV, &raw)?;
        }
        if let Some(raw) = lookup(CASCADE_PATH_ENV) {
            self.cascade = PathBuf::from(raw);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.match_threshold.is_finite() && self.match_threshold > 0.0,
            "match_threshold must be a positive number, got {}",
            self.match_threshold
        );
        ensure!(
            self.confidence_max_distance.is_finite() && self.confidence_max_distance > 0.0,
            "confidence_max_distance must be a positive number, got {}",
            self.confidence_max_distance
        );
        self.detector.validate()?;
        Ok(())
    }
}

fn parse_float(name: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .with_context(|| format!("{name} must be a number, got '{raw}'"))
}

/// Load the config file (defaults if it does not exist), then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let mut cfg = if path.exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config at {}", path.display()))?;
        Config::from_toml(&raw).with_context(|| format!("parsing config {}", path.display()))?
    } else {
        Config::default()
    };

    cfg.apply_overrides(|name| std::env::var(name).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.match_threshold, 25.0);
        assert_eq!(cfg.confidence_max_distance, 40.0);
        assert_eq!(cfg.selection, SelectionStrategy::LargestArea);
        assert_eq!(cfg.detector.scale_factor, 1.1);
        assert_eq!(cfg.detector.min_neighbors, 5);
        assert_eq!(cfg.detector.min_size, 60);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml(
            r#"
match_threshold = 18.5
selection = "most-central"

[detector]
min_size = 80
"#,
        )
        .unwrap();
        assert_eq!(cfg.match_threshold, 18.5);
        assert_eq!(cfg.confidence_max_distance, 40.0);
        assert_eq!(cfg.selection, SelectionStrategy::MostCentral);
        assert_eq!(cfg.detector.min_size, 80);
        assert_eq!(cfg.detector.min_neighbors, 5);
    }

    #[test]
    fn unknown_strategy_rejected() {
        assert!(Config::from_toml(r#"selection = "biggest""#).is_err());
    }

    #[test]
    fn overrides_win_over_file() {
        let env: HashMap<&str, &str> = [
            (MATCH_THRESHOLD_ENV, "30"),
            (CONFIDENCE_MAX_DISTANCE_ENV, " 55.5 "),
            (CASCADE_PATH_ENV, "/tmp/cascade.xml"),
        ]
        .into_iter()
        .collect();

        let mut cfg = Config::from_toml("match_threshold = 10.0").unwrap();
        cfg.apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.match_threshold, 30.0);
        assert_eq!(cfg.confidence_max_distance, 55.5);
        assert_eq!(cfg.cascade, PathBuf::from("/tmp/cascade.xml"));
    }

    #[test]
    fn bad_override_is_an_error() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_overrides(|name| (name == MATCH_THRESHOLD_ENV).then(|| "abc".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("MATCH_THRESHOLD"));
    }

    #[test]
    fn validation_rejects_non_positive_thresholds() {
        let cfg = Config {
            match_threshold: 0.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            confidence_max_distance: f64::INFINITY,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.detector.scale_factor = 0.9;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg.detector, DetectorParams::default());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "cascade = \"/opt/cascades/face.xml\"\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        if std::env::var_os(CASCADE_PATH_ENV).is_none() {
            assert_eq!(cfg.cascade, PathBuf::from("/opt/cascades/face.xml"));
        }
    }
}
