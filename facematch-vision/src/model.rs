use std::path::Path;

use anyhow::{Context, Result};

use crate::cascade::HaarCascade;
use crate::detector::{CascadeDetector, DetectorParams};

pub fn load_cascade(path: &Path) -> Result<HaarCascade> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading cascade {}", path.display()))?;
    HaarCascade::from_xml(&raw).with_context(|| format!("parsing cascade {}", path.display()))
}

pub fn cascade_detector(path: &Path, params: DetectorParams) -> Result<CascadeDetector> {
    let cascade = load_cascade(path)?;
    log::info!(
        "Loaded cascade {} ({} stages, {}x{} window)",
        path.display(),
        cascade.stage_count(),
        cascade.window_size().0,
        cascade.window_size().1
    );
    CascadeDetector::new(cascade, params).context("configuring face detector")
}
