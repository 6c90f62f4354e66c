//! DOM heaviness scan: finds visually expensive elements and scores the page.
//!
//! Per element: base weight for each expensive effect, multiplied by an area
//! tier. The page score is the capped sum over all matched elements.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ComputedStyle, Document, NodeId, Rect};
use crate::css::{blur_radius_px, parse_time_list_s};

/// Base weights and area multipliers of the heaviness score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeavinessWeights {
    pub backdrop_filter: f64,
    pub blur_filter: f64,
    pub other_filter: f64,
    pub box_shadow: f64,
    pub transform_3d: f64,
    pub transform_2d: f64,
    pub animation: f64,
    /// Area above which the large multiplier applies (px²).
    pub large_area: f64,
    pub large_multiplier: f64,
    pub medium_area: f64,
    pub medium_multiplier: f64,
}

impl Default for HeavinessWeights {
    fn default() -> Self {
        Self {
            backdrop_filter: 20.0,
            blur_filter: 15.0,
            other_filter: 4.0,
            box_shadow: 5.0,
            transform_3d: 10.0,
            transform_2d: 4.0,
            animation: 6.0,
            large_area: 400.0 * 400.0,
            large_multiplier: 2.0,
            medium_area: 250.0 * 250.0,
            medium_multiplier: 1.5,
        }
    }
}

/// Expensive-style facts of one element, captured before any mutation.
///
/// Every degradation is computed from these originals, never from the live
/// (possibly already degraded) style, which keeps re-application stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectFacts {
    pub backdrop_filter: Option<String>,
    pub filter: Option<String>,
    pub filter_has_blur: bool,
    pub box_shadow: Option<String>,
    pub transform: Option<String>,
    pub transform_is_3d: bool,
    pub animation_name: Option<String>,
    /// Seconds per entry of the animation-duration list.
    pub animation_durations_s: Vec<f64>,
    pub has_transition: bool,
}

impl EffectFacts {
    pub fn from_style(style: &ComputedStyle) -> Self {
        let filter = non_default(&style.filter);
        let transform = non_default(&style.transform);
        Self {
            backdrop_filter: non_default(&style.backdrop_filter),
            filter_has_blur: filter
                .as_deref()
                .is_some_and(|f| blur_radius_px(f).is_some()),
            filter,
            box_shadow: non_default(&style.box_shadow),
            transform_is_3d: transform.as_deref().is_some_and(|t| t.contains("3d")),
            transform,
            animation_name: non_default(&style.animation_name),
            animation_durations_s: parse_time_list_s(&style.animation_duration)
                .unwrap_or_default(),
            has_transition: parse_time_list_s(&style.transition_duration)
                .is_some_and(|durations| durations.iter().any(|d| *d > 0.0)),
        }
    }

    /// Backdrop blur or blur filter: the frosted-glass family.
    pub fn is_glass_like(&self) -> bool {
        self.backdrop_filter.is_some() || self.filter_has_blur
    }
}

fn non_default(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "none" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// An element the scan flagged as expensive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeavyElement {
    pub node: NodeId,
    pub facts: EffectFacts,
    pub rect: Rect,
    pub area: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomScan {
    /// Capped page-level score.
    pub heaviness: f64,
    pub elements: Vec<HeavyElement>,
}

/// Score of a single element; zero means "not heavy".
pub fn element_score(facts: &EffectFacts, area: f64, weights: &HeavinessWeights) -> f64 {
    let mut score = 0.0;
    if facts.backdrop_filter.is_some() {
        score += weights.backdrop_filter;
    }
    if facts.filter.is_some() {
        score += if facts.filter_has_blur {
            weights.blur_filter
        } else {
            weights.other_filter
        };
    }
    if facts.box_shadow.is_some() {
        score += weights.box_shadow;
    }
    if facts.transform.is_some() {
        score += if facts.transform_is_3d {
            weights.transform_3d
        } else {
            weights.transform_2d
        };
    }
    if facts.animation_name.is_some() {
        score += weights.animation;
    }

    if area > weights.large_area {
        score * weights.large_multiplier
    } else if area > weights.medium_area {
        score * weights.medium_multiplier
    } else {
        score
    }
}

/// Scans every candidate element. Elements whose style or geometry cannot be
/// read are skipped.
pub fn scan_document(doc: &mut dyn Document, weights: &HeavinessWeights, cap: f64) -> DomScan {
    let mut total = 0.0;
    let mut elements = Vec::new();

    for node in doc.candidates() {
        let (style, rect) = match (doc.computed_style(node), doc.bounding_rect(node)) {
            (Ok(style), Ok(rect)) => (style, rect),
            (Err(e), _) | (_, Err(e)) => {
                debug!(node = node.0, error = %e, "Skipping unreadable element");
                continue;
            }
        };

        let facts = EffectFacts::from_style(&style);
        let area = rect.area();
        let score = element_score(&facts, area, weights);
        if score > 0.0 {
            total += score;
            elements.push(HeavyElement {
                node,
                facts,
                rect,
                area,
                score,
            });
        }
    }

    let heaviness = total.min(cap);
    debug!(
        heavy_elements = elements.len(),
        raw_score = total,
        heaviness,
        "DOM heaviness scan complete"
    );

    DomScan {
        heaviness,
        elements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, MemoryElement};

    fn small() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_plain_element_not_heavy() {
        let mut doc = MemoryDocument::default();
        doc.push(MemoryElement::new(small()));
        let scan = scan_document(&mut doc, &HeavinessWeights::default(), 5000.0);
        assert!(scan.elements.is_empty());
        assert_eq!(scan.heaviness, 0.0);
    }

    #[test]
    fn test_weights_per_effect() {
        let w = HeavinessWeights::default();
        let glass = EffectFacts::from_style(&ComputedStyle {
            backdrop_filter: "blur(12px)".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(element_score(&glass, 100.0, &w), 20.0);

        let blur = EffectFacts::from_style(&ComputedStyle {
            filter: "blur(4px)".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(element_score(&blur, 100.0, &w), 15.0);

        let tint = EffectFacts::from_style(&ComputedStyle {
            filter: "saturate(2)".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(element_score(&tint, 100.0, &w), 4.0);

        let flip = EffectFacts::from_style(&ComputedStyle {
            transform: "matrix3d(1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1)".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(element_score(&flip, 100.0, &w), 10.0);

        let shift = EffectFacts::from_style(&ComputedStyle {
            transform: "matrix(1, 0, 0, 1, 10, 0)".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(element_score(&shift, 100.0, &w), 4.0);
    }

    #[test]
    fn test_area_multipliers() {
        let w = HeavinessWeights::default();
        let facts = EffectFacts::from_style(&ComputedStyle {
            box_shadow: "rgba(0, 0, 0, 0.2) 0px 10px 30px 0px".into(),
            animation_name: "float".into(),
            animation_duration: "3s".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(element_score(&facts, 300.0 * 300.0, &w), 16.5);
        assert_eq!(element_score(&facts, 500.0 * 500.0, &w), 22.0);
    }

    #[test]
    fn test_scan_caps_total() {
        let mut doc = MemoryDocument::default();
        for _ in 0..50 {
            doc.push(
                MemoryElement::new(Rect::new(0.0, 0.0, 500.0, 500.0))
                    .backdrop_filter("blur(20px)")
                    .filter("blur(8px)"),
            );
        }
        let scan = scan_document(&mut doc, &HeavinessWeights::default(), 1000.0);
        assert_eq!(scan.elements.len(), 50);
        assert_eq!(scan.heaviness, 1000.0);
    }

    #[test]
    fn test_scan_skips_detached_elements() {
        let mut doc = MemoryDocument::default();
        let gone = doc.push(MemoryElement::new(small()).box_shadow("0 0 4px black"));
        let kept = doc.push(MemoryElement::new(small()).box_shadow("0 0 4px black"));
        doc.detach(gone);
        let scan = scan_document(&mut doc, &HeavinessWeights::default(), 5000.0);
        assert_eq!(scan.elements.len(), 1);
        assert_eq!(scan.elements[0].node, kept);
    }

    #[test]
    fn test_facts_capture_durations_and_transitions() {
        let facts = EffectFacts::from_style(&ComputedStyle {
            animation_name: "spin".into(),
            animation_duration: "1.5s, 500ms".into(),
            transition_duration: "0s, 0.2s".into(),
            ..ComputedStyle::default()
        });
        assert_eq!(facts.animation_durations_s, vec![1.5, 0.5]);
        assert!(facts.has_transition);
        assert!(!facts.is_glass_like());
    }
}
