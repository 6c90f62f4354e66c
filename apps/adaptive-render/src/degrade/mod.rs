//! Degradation application: marker class, stylesheet, inline mutations.
//!
//! `Degrader` remembers the inline value each touched property had before the
//! engine wrote it. Applying a tier writes that tier's planned values and
//! restores every property the new plan no longer covers, so the end state
//! depends only on the tier and the scanned elements, never on what was applied
//! before. Re-applying the same tier writes nothing.

pub mod rules;
pub mod stylesheet;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::dom::{Document, HeavyElement, NodeId, StyleProperty};
use crate::tier::CapabilityTier;

pub use rules::{plan_mutations, ruleset, Predicate, Rule, StyleMutation, ValueRule};
pub use stylesheet::{render_stylesheet, TierCss, OFFSCREEN_CLASS, STYLESHEET_ID, TIER_CSS};

/// What one `apply_tier` call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub written: usize,
    pub restored: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub stylesheet_injected: bool,
}

#[derive(Debug, Default)]
pub struct Degrader {
    /// Inline value before the engine's first write, per touched property.
    originals: BTreeMap<(NodeId, StyleProperty), Option<String>>,
    /// Values currently written by the engine.
    applied: BTreeMap<(NodeId, StyleProperty), String>,
    offscreen: BTreeSet<NodeId>,
}

impl Degrader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `tier` to the document. Never fails: elements that cannot be
    /// read or written are skipped.
    pub fn apply_tier(
        &mut self,
        doc: &mut dyn Document,
        tier: CapabilityTier,
        elements: &[HeavyElement],
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        set_marker_class(doc, tier);
        report.stylesheet_injected = ensure_stylesheet(doc);

        let plan = plan_mutations(tier, elements);
        let planned: BTreeSet<(NodeId, StyleProperty)> =
            plan.iter().map(|m| (m.node, m.property)).collect();

        let stale: Vec<(NodeId, StyleProperty)> = self
            .applied
            .keys()
            .filter(|key| !planned.contains(key))
            .copied()
            .collect();
        for key in stale {
            self.restore(doc, key, &mut report);
        }

        for mutation in plan {
            self.write(doc, mutation, &mut report);
        }

        self.mark_offscreen(doc, tier, elements, &mut report);

        info!(
            tier = %tier,
            written = report.written,
            restored = report.restored,
            skipped = report.skipped,
            "Applied capability tier"
        );
        report
    }

    fn write(&mut self, doc: &mut dyn Document, mutation: StyleMutation, report: &mut ApplyReport) {
        let key = (mutation.node, mutation.property);
        if self.applied.get(&key) == Some(&mutation.value) {
            report.unchanged += 1;
            return;
        }

        if !self.originals.contains_key(&key) {
            match doc.inline_style(mutation.node, mutation.property) {
                Ok(original) => {
                    self.originals.insert(key, original);
                }
                Err(e) => {
                    debug!(node = mutation.node.0, error = %e, "Skipping unreadable element");
                    report.skipped += 1;
                    return;
                }
            }
        }

        match doc.set_inline_style(mutation.node, mutation.property, Some(&mutation.value)) {
            Ok(()) => {
                self.applied.insert(key, mutation.value);
                report.written += 1;
            }
            Err(e) => {
                debug!(node = mutation.node.0, error = %e, "Skipping unwritable element");
                report.skipped += 1;
            }
        }
    }

    fn restore(
        &mut self,
        doc: &mut dyn Document,
        key: (NodeId, StyleProperty),
        report: &mut ApplyReport,
    ) {
        self.applied.remove(&key);
        let original = self.originals.get(&key).cloned().flatten();
        match doc.set_inline_style(key.0, key.1, original.as_deref()) {
            Ok(()) => report.restored += 1,
            Err(e) => {
                debug!(node = key.0 .0, error = %e, "Could not restore inline style");
                report.skipped += 1;
            }
        }
    }

    /// Flags heavy elements lying fully outside the viewport. `High` clears
    /// every flag.
    fn mark_offscreen(
        &mut self,
        doc: &mut dyn Document,
        tier: CapabilityTier,
        elements: &[HeavyElement],
        report: &mut ApplyReport,
    ) {
        let viewport = doc.viewport();
        let mut now_offscreen = BTreeSet::new();
        if tier != CapabilityTier::High {
            for element in elements {
                if let Ok(rect) = doc.bounding_rect(element.node) {
                    if !rect.intersects(&viewport) {
                        now_offscreen.insert(element.node);
                    }
                }
            }
        }

        let cleared = self.offscreen.difference(&now_offscreen).map(|node| (*node, false));
        let flagged = now_offscreen.difference(&self.offscreen).map(|node| (*node, true));
        for (node, enabled) in cleared.chain(flagged) {
            if let Err(e) = doc.set_class(node, OFFSCREEN_CLASS, enabled) {
                debug!(node = node.0, enabled, error = %e, "Could not toggle offscreen flag");
                report.skipped += 1;
            }
        }
        self.offscreen = now_offscreen;
    }
}

/// Leaves exactly one tier marker class on the root.
fn set_marker_class(doc: &mut dyn Document, tier: CapabilityTier) {
    for other in CapabilityTier::ALL.iter().filter(|t| **t != tier) {
        doc.set_root_class(other.marker_class(), false);
    }
    doc.set_root_class(tier.marker_class(), true);
}

/// Injects the tier stylesheet unless already present. Returns whether it
/// was injected by this call.
fn ensure_stylesheet(doc: &mut dyn Document) -> bool {
    if doc.has_stylesheet(STYLESHEET_ID) {
        return false;
    }
    match doc.inject_stylesheet(STYLESHEET_ID, &render_stylesheet(TIER_CSS)) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "Stylesheet injection failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{scan_document, HeavinessWeights, MemoryDocument, MemoryElement, Rect};

    fn sample_document() -> (MemoryDocument, Vec<HeavyElement>) {
        let mut doc = MemoryDocument::default();
        doc.push(
            MemoryElement::new(Rect::new(20.0, 20.0, 420.0, 420.0))
                .class("glass-card")
                .backdrop_filter("blur(18px)")
                .box_shadow("rgba(0, 0, 0, 0.12) 0px 12px 40px 0px")
                .transform("matrix(1, 0, 0, 1, 0, -6)"),
        );
        doc.push(
            MemoryElement::new(Rect::new(40.0, 500.0, 120.0, 40.0))
                .filter("blur(6px)")
                .animation("pulse", "2s")
                .transition("0.2s")
                .inline_style(StyleProperty::Filter, "blur(6px)"),
        );
        doc.push(
            MemoryElement::new(Rect::new(0.0, 3000.0, 300.0, 300.0))
                .box_shadow("0 0 10px black")
                .transform("matrix3d(1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1)"),
        );
        doc.push(MemoryElement::new(Rect::new(0.0, 0.0, 50.0, 50.0)));
        let scan = scan_document(&mut doc, &HeavinessWeights::default(), 5000.0);
        (doc, scan.elements)
    }

    #[test]
    fn test_exactly_one_marker_class() {
        let (mut doc, heavy) = sample_document();
        let mut degrader = Degrader::new();
        for tier in CapabilityTier::ALL {
            degrader.apply_tier(&mut doc, tier, &heavy);
            assert_eq!(doc.root_classes(), vec![tier.marker_class().to_string()]);
        }
    }

    #[test]
    fn test_high_leaves_inline_styles_alone() {
        let (mut doc, heavy) = sample_document();
        let before = doc.clone();
        let report = Degrader::new().apply_tier(&mut doc, CapabilityTier::High, &heavy);
        assert_eq!(report.written, 0);
        assert_eq!(doc.element(NodeId(0)), before.element(NodeId(0)));
        assert_eq!(doc.element(NodeId(1)), before.element(NodeId(1)));
        assert!(doc.stylesheet(STYLESHEET_ID).is_some());
    }

    #[test]
    fn test_apply_is_idempotent() {
        for tier in CapabilityTier::ALL {
            let (mut once, heavy) = sample_document();
            let mut degrader = Degrader::new();
            degrader.apply_tier(&mut once, tier, &heavy);

            let mut twice = once.clone();
            let second = degrader.apply_tier(&mut twice, tier, &heavy);

            assert_eq!(once, twice, "{tier} changed state on re-application");
            assert_eq!(second.written, 0);
            assert!(!second.stylesheet_injected);
            assert_eq!(twice.stylesheet_count(), 1);
        }
    }

    #[test]
    fn test_no_compounding_blur_reduction() {
        let (mut doc, heavy) = sample_document();
        let mut degrader = Degrader::new();
        degrader.apply_tier(&mut doc, CapabilityTier::Mid, &heavy);
        degrader.apply_tier(&mut doc, CapabilityTier::Mid, &heavy);
        assert_eq!(doc.inline(NodeId(1), StyleProperty::Filter), Some("blur(1.8px)"));
    }

    #[test]
    fn test_demotion_end_state_matches_direct_application() {
        let (mut stepped, heavy) = sample_document();
        let mut degrader = Degrader::new();
        for tier in CapabilityTier::ALL {
            degrader.apply_tier(&mut stepped, tier, &heavy);
        }

        let (mut direct, heavy_direct) = sample_document();
        Degrader::new().apply_tier(&mut direct, CapabilityTier::VeryLow, &heavy_direct);

        assert_eq!(stepped, direct);
    }

    #[test]
    fn test_very_low_flattens_glass() {
        let (mut doc, heavy) = sample_document();
        Degrader::new().apply_tier(&mut doc, CapabilityTier::VeryLow, &heavy);
        for node in [NodeId(0), NodeId(1)] {
            let style = doc.computed_style(node).unwrap();
            assert_eq!(style.backdrop_filter, "none");
            assert_eq!(style.filter, "none");
            assert_eq!(style.background_color, "rgb(255, 255, 255)");
        }
        assert_eq!(doc.computed_style(NodeId(1)).unwrap().animation_name, "none");
        assert_eq!(doc.inline(NodeId(1), StyleProperty::Transition), Some("none"));
    }

    #[test]
    fn test_plain_element_never_touched() {
        let (mut doc, heavy) = sample_document();
        let before = doc.element(NodeId(3)).cloned();
        Degrader::new().apply_tier(&mut doc, CapabilityTier::VeryLow, &heavy);
        assert_eq!(doc.element(NodeId(3)).cloned(), before);
    }

    #[test]
    fn test_offscreen_flag_follows_tier() {
        let (mut doc, heavy) = sample_document();
        let mut degrader = Degrader::new();
        degrader.apply_tier(&mut doc, CapabilityTier::Low, &heavy);
        let offscreen = |doc: &MemoryDocument, node| {
            doc.element(node).unwrap().classes.contains(OFFSCREEN_CLASS)
        };
        assert!(offscreen(&doc, NodeId(2)));
        assert!(!offscreen(&doc, NodeId(0)));

        degrader.apply_tier(&mut doc, CapabilityTier::High, &heavy);
        assert!(!offscreen(&doc, NodeId(2)));
    }

    #[test]
    fn test_detached_element_skipped_silently() {
        let (mut doc, heavy) = sample_document();
        doc.detach(NodeId(0));
        let report = Degrader::new().apply_tier(&mut doc, CapabilityTier::VeryLow, &heavy);
        assert!(report.skipped > 0);
        assert_eq!(doc.inline(NodeId(2), StyleProperty::Transform), Some("none"));
    }

    #[test]
    fn test_offscreen_toggle_on_detached_element_is_counted() {
        let (mut doc, heavy) = sample_document();
        let mut degrader = Degrader::new();
        degrader.apply_tier(&mut doc, CapabilityTier::Low, &heavy);
        doc.detach(NodeId(2));

        let report = degrader.apply_tier(&mut doc, CapabilityTier::Low, &heavy);

        assert_eq!(report.written, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_restores_preexisting_inline_value() {
        let (mut doc, heavy) = sample_document();
        let mut degrader = Degrader::new();
        degrader.apply_tier(&mut doc, CapabilityTier::VeryLow, &heavy);
        assert_eq!(doc.inline(NodeId(1), StyleProperty::Filter), Some("none"));
        degrader.apply_tier(&mut doc, CapabilityTier::High, &heavy);
        assert_eq!(doc.inline(NodeId(1), StyleProperty::Filter), Some("blur(6px)"));
    }
}
