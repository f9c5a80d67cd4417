use facematch_vision::Encoding;
use serde::Serialize;

use crate::config::Config;

/// Best match of one encoding against a reference set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub best_index: usize,
    pub distance: f64,
    pub is_match: bool,
    pub threshold: f64,
    pub confidence: f64,
}

/// Distance-based match decision.
///
/// `is_match` and `confidence` come from two independent thresholds, so a
/// non-match can still report a non-zero confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matcher {
    match_threshold: f64,
    confidence_max_distance: f64,
}

impl Matcher {
    pub fn new(match_threshold: f64, confidence_max_distance: f64) -> Self {
        Self {
            match_threshold,
            confidence_max_distance,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.match_threshold, cfg.confidence_max_distance)
    }

    pub fn threshold(&self) -> f64 {
        self.match_threshold
    }

    pub fn is_match(&self, distance: f64) -> bool {
        distance < self.match_threshold
    }

    /// Linear decay from 100 at distance 0 to 0 at `confidence_max_distance`, clamped at 0.
    pub fn confidence(&self, distance: f64) -> f64 {
        (100.0 * (1.0 - distance / self.confidence_max_distance)).max(0.0)
    }

    /// Closest reference to `unknown`; ties go to the lowest index.
    ///
    /// Returns `None` only for an empty reference list.
    pub fn best_match(&self, unknown: &Encoding, known: &[Encoding]) -> Option<MatchResult> {
        let (best_index, distance) = known
            .iter()
            .map(|k| unknown.distance(k))
            .enumerate()
            .fold(None::<(usize, f64)>, |acc, (i, d)| match acc {
                Some((_, best)) if best <= d => acc,
                _ => Some((i, d)),
            })?;

        Some(MatchResult {
            best_index,
            distance,
            is_match: self.is_match(distance),
            threshold: self.match_threshold,
            confidence: self.confidence(distance),
        })
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facematch_vision::ENCODING_LEN;

    fn filled(v: f64) -> Encoding {
        Encoding::try_from_vec(vec![v; ENCODING_LEN]).unwrap()
    }

    #[test]
    fn exact_match_scenario() {
        let matcher = Matcher::default();
        let result = matcher
            .best_match(&filled(0.0), &[filled(0.0), filled(1.0)])
            .unwrap();
        assert_eq!(result.best_index, 0);
        assert_eq!(result.distance, 0.0);
        assert!(result.is_match);
        assert_eq!(result.threshold, 25.0);
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn far_vector_scenario() {
        let matcher = Matcher::default();
        let result = matcher.best_match(&filled(0.5), &[filled(0.0)]).unwrap();
        assert_eq!(result.best_index, 0);
        assert_eq!(result.distance, 50.0);
        assert!(!result.is_match);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        let matcher = Matcher::default();
        // sqrt(10000 * 0.25^2) = 25.0 exactly.
        let result = matcher.best_match(&filled(0.0), &[filled(0.25)]).unwrap();
        assert_eq!(result.distance, 25.0);
        assert!(!result.is_match);
        assert!(matcher.is_match(24.999));
        assert!(!matcher.is_match(25.0));
    }

    #[test]
    fn non_match_can_keep_confidence() {
        let matcher = Matcher::default();
        // Distance 30 is past the 25.0 cutoff but short of the 40.0 zero point.
        let result = matcher.best_match(&filled(0.0), &[filled(0.3)]).unwrap();
        assert!(!result.is_match);
        assert!((result.confidence - 25.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_monotone_and_clamped() {
        let matcher = Matcher::default();
        let mut previous = f64::INFINITY;
        for step in 0..=100 {
            let distance = step as f64;
            let confidence = matcher.confidence(distance);
            assert!(confidence <= previous);
            assert!((0.0..=100.0).contains(&confidence));
            if distance >= 40.0 {
                assert_eq!(confidence, 0.0);
            }
            previous = confidence;
        }
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let matcher = Matcher::default();
        let result = matcher
            .best_match(&filled(0.5), &[filled(1.0), filled(0.0), filled(0.6), filled(0.4)])
            .unwrap();
        // 0.6 and 0.4 are both 10.0 away; 0.6 comes first.
        assert_eq!(result.best_index, 2);
    }

    #[test]
    fn idempotent() {
        let matcher = Matcher::new(20.0, 60.0);
        let known = [filled(0.1), filled(0.2), filled(0.9)];
        let unknown = filled(0.15);
        assert_eq!(
            matcher.best_match(&unknown, &known),
            matcher.best_match(&unknown, &known)
        );
    }

    #[test]
    fn thresholds_are_per_instance() {
        let strict = Matcher::new(5.0, 8.0);
        let result = strict.best_match(&filled(0.0), &[filled(0.1)]).unwrap();
        assert_eq!(result.threshold, 5.0);
        assert!(!result.is_match);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn empty_reference_list() {
        assert_eq!(Matcher::default().best_match(&filled(0.0), &[]), None);
    }
}
