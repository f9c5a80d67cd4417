use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::face::FaceRegion;

/// Policy for picking one face when the locator returns several.
///
/// Both strategies break ties in favour of the region the detector reported first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionStrategy {
    /// Largest `width × height`.
    #[default]
    LargestArea,
    /// Centre closest to the image centre.
    MostCentral,
}

impl SelectionStrategy {
    pub fn select<'a>(
        &self,
        regions: &'a [FaceRegion],
        image_width: u32,
        image_height: u32,
    ) -> Option<&'a FaceRegion> {
        match self {
            // Not `max_by_key`: it keeps the last of equal elements.
            SelectionStrategy::LargestArea => {
                regions
                    .iter()
                    .fold(None::<&FaceRegion>, |best, r| match best {
                        Some(b) if b.area() >= r.area() => Some(b),
                        _ => Some(r),
                    })
            }
            SelectionStrategy::MostCentral => {
                let cx = f64::from(image_width) / 2.0;
                let cy = f64::from(image_height) / 2.0;
                let offset = |r: &FaceRegion| {
                    let (x, y) = r.center();
                    (x - cx).powi(2) + (y - cy).powi(2)
                };
                regions.iter().fold(None::<&FaceRegion>, |best, r| match best {
                    Some(b) if offset(b) <= offset(r) => Some(b),
                    _ => Some(r),
                })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionStrategy::LargestArea => "largest-area",
            SelectionStrategy::MostCentral => "most-central",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "largest-area" => Ok(SelectionStrategy::LargestArea),
            "most-central" => Ok(SelectionStrategy::MostCentral),
            other => Err(format!(
                "unknown selection strategy '{other}', expected largest-area or most-central"
            )),
        }
    }
}
