//! Boosted Haar cascade in OpenCV's XML layout (`haarcascade_frontalface_default.xml`).
//!
//! The file describes a detection window (24x24 for the frontal face cascade), a list
//! of rectangle features and a sequence of stages. Each stage sums the leaf values of
//! its weak classifiers; a window survives the stage when the sum reaches the stage
//! threshold. Weak classifiers are decision trees stored as
//! `left right feature threshold` quadruples, where a non-positive child index `-k`
//! selects leaf `k`.
//!
//! Feature responses are rectangle sums weighted by the XML weights and divided by
//! `area × stddev` of the window interior `(1, 1, W-2, H-2)`, which makes the
//! thresholds independent of lighting and contrast.

use roxmltree::{Document, Node};

use crate::error::{VisionError, VisionResult};
use crate::integral::IntegralImage;

/// Subtracted from every stage threshold on load.
const THRESHOLD_EPS: f32 = 1e-5;

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f32,
}

#[derive(Debug, Clone)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

impl HaarFeature {
    fn response(&self, integral: &IntegralImage, wx: u32, wy: u32) -> f32 {
        self.rects
            .iter()
            .map(|r| r.weight * integral.rect_sum(wx + r.x, wy + r.y, r.width, r.height) as f32)
            .sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f32,
}

#[derive(Debug, Clone)]
struct WeakClassifier {
    nodes: Vec<TreeNode>,
    leaves: Vec<f32>,
}

impl WeakClassifier {
    fn predict(&self, mut feature: impl FnMut(usize) -> f32) -> f32 {
        let mut idx = 0usize;
        loop {
            let node = &self.nodes[idx];
            let next = if feature(node.feature) < node.threshold {
                node.left
            } else {
                node.right
            };
            if next > 0 {
                idx = next as usize;
            } else {
                return self.leaves[next.unsigned_abs() as usize];
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f32,
    classifiers: Vec<WeakClassifier>,
}

/// Immutable cascade model. Shared read-only between concurrent detections.
#[derive(Debug, Clone)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    /// Parse a cascade from OpenCV's XML storage format.
    pub fn from_xml(text: &str) -> VisionResult<Self> {
        let doc = Document::parse(text).map_err(|e| cascade_err(format!("malformed XML: {e}")))?;
        let root = doc
            .descendants()
            .find(|n| n.has_tag_name("cascade"))
            .ok_or_else(|| cascade_err("missing <cascade> element"))?;

        let stage_type = child_text(root, "stageType")?;
        if stage_type != "BOOST" {
            return Err(cascade_err(format!("unsupported stage type {stage_type}")));
        }
        let feature_type = child_text(root, "featureType")?;
        if feature_type != "HAAR" {
            return Err(cascade_err(format!("unsupported feature type {feature_type}")));
        }

        let window_width: u32 = parse_child(root, "width")?;
        let window_height: u32 = parse_child(root, "height")?;
        if window_width < 3 || window_height < 3 {
            return Err(cascade_err(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let features = items(child(root, "features")?)
            .enumerate()
            .map(|(i, node)| parse_feature(node, i, window_width, window_height))
            .collect::<VisionResult<Vec<_>>>()?;

        let stages = items(child(root, "stages")?)
            .enumerate()
            .map(|(i, node)| parse_stage(node, i, features.len()))
            .collect::<VisionResult<Vec<_>>>()?;
        if stages.is_empty() {
            return Err(cascade_err("cascade has no stages"));
        }

        log::debug!(
            "parsed cascade: window={}x{} stages={} features={}",
            window_width,
            window_height,
            stages.len(),
            features.len()
        );

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage on the window whose top-left corner is `(x, y)`.
    ///
    /// The window must lie inside the image the integral was built from.
    pub fn classify(&self, integral: &IntegralImage, x: u32, y: u32) -> bool {
        let norm =
            integral.variance_norm(x + 1, y + 1, self.window_width - 2, self.window_height - 2);
        self.stages.iter().all(|stage| {
            let sum: f32 = stage
                .classifiers
                .iter()
                .map(|weak| weak.predict(|f| self.features[f].response(integral, x, y) * norm))
                .sum();
            sum >= stage.threshold
        })
    }
}

fn cascade_err(message: impl Into<String>) -> VisionError {
    VisionError::Cascade(message.into())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> VisionResult<Node<'a, 'input>> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .ok_or_else(|| cascade_err(format!("missing <{name}> element")))
}

fn child_text<'a>(node: Node<'a, '_>, name: &str) -> VisionResult<&'a str> {
    Ok(child(node, name)?.text().map(str::trim).unwrap_or_default())
}

fn parse_child<T: std::str::FromStr>(node: Node, name: &str) -> VisionResult<T> {
    let text = child_text(node, name)?;
    text.parse()
        .map_err(|_| cascade_err(format!("<{name}> has invalid value '{text}'")))
}

/// Element children named `_`, OpenCV's sequence item tag.
fn items<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element() && n.has_tag_name("_"))
}

fn tokens<T: std::str::FromStr>(text: &str, what: &str) -> VisionResult<Vec<T>> {
    text.split_whitespace()
        .map(|t| t.parse().map_err(|_| cascade_err(format!("{what}: invalid number '{t}'"))))
        .collect()
}

fn parse_feature(
    node: Node,
    index: usize,
    window_width: u32,
    window_height: u32,
) -> VisionResult<HaarFeature> {
    if let Ok(tilted) = child_text(node, "tilted") {
        if tilted != "0" {
            return Err(cascade_err(format!("feature {index}: tilted features are not supported")));
        }
    }

    let rects = items(child(node, "rects")?)
        .map(|r| {
            let what = format!("feature {index} rect");
            let values: Vec<f32> = tokens(r.text().unwrap_or_default(), &what)?;
            let [x, y, width, height, weight] = values[..] else {
                return Err(cascade_err(format!("{what}: expected 5 values, got {}", values.len())));
            };
            if [x, y, width, height].iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
                return Err(cascade_err(format!(
                    "{what}: coordinates must be non-negative integers"
                )));
            }
            let rect = WeightedRect {
                x: x as u32,
                y: y as u32,
                width: width as u32,
                height: height as u32,
                weight,
            };
            if rect.x + rect.width > window_width || rect.y + rect.height > window_height {
                return Err(cascade_err(format!("{what}: rectangle exceeds the detection window")));
            }
            Ok(rect)
        })
        .collect::<VisionResult<Vec<_>>>()?;

    if rects.is_empty() {
        return Err(cascade_err(format!("feature {index} has no rectangles")));
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: Node, index: usize, feature_count: usize) -> VisionResult<Stage> {
    let threshold: f32 = parse_child(node, "stageThreshold")?;
    let classifiers = items(child(node, "weakClassifiers")?)
        .enumerate()
        .map(|(i, weak)| parse_weak(weak, index, i, feature_count))
        .collect::<VisionResult<Vec<_>>>()?;
    if classifiers.is_empty() {
        return Err(cascade_err(format!("stage {index} has no weak classifiers")));
    }
    Ok(Stage {
        threshold: threshold - THRESHOLD_EPS,
        classifiers,
    })
}

fn parse_weak(
    node: Node,
    stage: usize,
    index: usize,
    feature_count: usize,
) -> VisionResult<WeakClassifier> {
    let what = format!("stage {stage} classifier {index}");
    let raw: Vec<f64> = tokens(child_text(node, "internalNodes")?, &what)?;
    let leaves: Vec<f32> = tokens(child_text(node, "leafValues")?, &what)?;

    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(cascade_err(format!(
            "{what}: internal nodes must be groups of 4 values, got {}",
            raw.len()
        )));
    }

    let mut nodes = Vec::with_capacity(raw.len() / 4);
    for (i, quad) in raw.chunks_exact(4).enumerate() {
        let node = TreeNode {
            left: quad[0] as i32,
            right: quad[1] as i32,
            feature: quad[2] as usize,
            threshold: quad[3] as f32,
        };
        if quad[2] < 0.0 || node.feature >= feature_count {
            return Err(cascade_err(format!("{what}: feature index {} out of range", quad[2])));
        }
        for next in [node.left, node.right] {
            // Children must point forward so evaluation always terminates.
            let valid = if next > 0 {
                (next as usize) > i && (next as usize) < raw.len() / 4
            } else {
                (next.unsigned_abs() as usize) < leaves.len()
            };
            if !valid {
                return Err(cascade_err(format!("{what}: node {i} has invalid child {next}")));
            }
        }
        nodes.push(node);
    }

    Ok(WeakClassifier { nodes, leaves })
}
