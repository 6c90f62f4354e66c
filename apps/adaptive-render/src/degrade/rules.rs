//! Per-tier inline degradation rules, expressed as data.
//!
//! A ruleset is a list of `(predicate, property, value)` rows. `plan_mutations`
//! evaluates one ruleset against the scanned heavy elements and yields the full
//! desired inline state for that tier. It touches no DOM.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::css::{blur_radius_px, format_number, format_time_list_s, replace_blur};
use crate::dom::{HeavyElement, NodeId, StyleProperty};
use crate::tier::CapabilityTier;

/// Elements above this area get the extra large-element factor.
pub const LARGE_AREA: f64 = 400.0 * 400.0;
pub const MEDIUM_AREA: f64 = 250.0 * 250.0;
/// Extra factor applied to shadows and animation durations of large elements.
const LARGE_ELEMENT_FACTOR: f64 = 0.4;
const SHADOW_BASE_ALPHA: f64 = 0.06;

/// Element selector: every listed condition must hold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate {
    BackdropFilter,
    BlurFilter,
    AnyFilter,
    BoxShadow,
    Transform,
    Transform3d,
    Animation,
    Transition,
    GlassLike,
    AreaAbove(f64),
}

impl Predicate {
    pub fn matches(self, element: &HeavyElement) -> bool {
        let facts = &element.facts;
        match self {
            Self::BackdropFilter => facts.backdrop_filter.is_some(),
            Self::BlurFilter => facts.filter_has_blur,
            Self::AnyFilter => facts.filter.is_some(),
            Self::BoxShadow => facts.box_shadow.is_some(),
            Self::Transform => facts.transform.is_some(),
            Self::Transform3d => facts.transform_is_3d,
            Self::Animation => facts.animation_name.is_some(),
            Self::Transition => facts.has_transition,
            Self::GlassLike => facts.is_glass_like(),
            Self::AreaAbove(threshold) => element.area > threshold,
        }
    }
}

/// How the new inline value is derived from the element's original facts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRule {
    Fixed(&'static str),
    /// Scale the filter blur radius, capped at `max_px`.
    ScaledFilterBlur { factor: f64, max_px: f64 },
    /// Scale the backdrop blur radius, capped at `max_px`.
    ScaledBackdropBlur { factor: f64, max_px: f64 },
    /// Replace the shadow with a faint one whose alpha follows `factor`.
    SoftShadow { factor: f64 },
    /// Multiply every animation duration by `factor`.
    ScaledAnimation { factor: f64 },
}

impl ValueRule {
    /// `None` means "nothing to write for this element".
    fn resolve(self, element: &HeavyElement) -> Option<String> {
        let facts = &element.facts;
        let large = element.area > LARGE_AREA;
        match self {
            Self::Fixed(value) => Some(value.to_string()),
            Self::ScaledFilterBlur { factor, max_px } => {
                let filter = facts.filter.as_deref()?;
                let radius = blur_radius_px(filter)?;
                Some(replace_blur(filter, (radius * factor).clamp(0.0, max_px)))
            }
            Self::ScaledBackdropBlur { factor, max_px } => {
                let backdrop = facts.backdrop_filter.as_deref()?;
                let radius = blur_radius_px(backdrop)?;
                Some(replace_blur(backdrop, (radius * factor).clamp(0.0, max_px)))
            }
            Self::SoftShadow { factor } => {
                facts.box_shadow.as_ref()?;
                let local = if large {
                    factor * LARGE_ELEMENT_FACTOR
                } else {
                    factor
                };
                Some(format!(
                    "0 2px 8px rgba(0, 0, 0, {})",
                    format_number(SHADOW_BASE_ALPHA * local)
                ))
            }
            Self::ScaledAnimation { factor } => {
                let durations = &facts.animation_durations_s;
                if durations.is_empty() || durations.iter().all(|d| *d == 0.0) {
                    return None;
                }
                let local = if large {
                    factor * LARGE_ELEMENT_FACTOR
                } else {
                    factor
                };
                let scaled: Vec<f64> = durations.iter().map(|d| d * local).collect();
                Some(format_time_list_s(&scaled))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub when: &'static [Predicate],
    pub property: StyleProperty,
    pub value: ValueRule,
}

const fn rule(when: &'static [Predicate], property: StyleProperty, value: ValueRule) -> Rule {
    Rule {
        when,
        property,
        value,
    }
}

use Predicate as P;
use StyleProperty as S;
use ValueRule as V;

const LARGE_TRANSFORM: &[Predicate] = &[P::Transform, P::AreaAbove(LARGE_AREA)];
const MEDIUM_TRANSFORM: &[Predicate] = &[P::Transform, P::AreaAbove(MEDIUM_AREA)];

const MID_RULES: &[Rule] = &[
    rule(&[P::BoxShadow], S::BoxShadow, V::SoftShadow { factor: 0.6 }),
    rule(&[P::BlurFilter], S::Filter, V::ScaledFilterBlur { factor: 0.3, max_px: 3.0 }),
    rule(&[P::BackdropFilter], S::BackdropFilter, V::ScaledBackdropBlur { factor: 0.3, max_px: 4.0 }),
    rule(&[P::BackdropFilter], S::BackgroundColor, V::Fixed("rgba(255, 255, 255, 0.75)")),
    rule(&[P::Transform3d], S::Transform, V::Fixed("none")),
    rule(LARGE_TRANSFORM, S::Transform, V::Fixed("none")),
    rule(&[P::Animation], S::AnimationDuration, V::ScaledAnimation { factor: 0.6 }),
];

const LOW_RULES: &[Rule] = &[
    rule(&[P::BoxShadow], S::BoxShadow, V::SoftShadow { factor: 0.4 }),
    rule(&[P::BlurFilter], S::Filter, V::ScaledFilterBlur { factor: 0.3, max_px: 3.0 }),
    rule(&[P::BackdropFilter], S::BackdropFilter, V::ScaledBackdropBlur { factor: 0.1, max_px: 1.0 }),
    rule(&[P::BackdropFilter], S::BackgroundColor, V::Fixed("rgba(255, 255, 255, 0.9)")),
    rule(&[P::Transform3d], S::Transform, V::Fixed("none")),
    rule(MEDIUM_TRANSFORM, S::Transform, V::Fixed("none")),
    rule(&[P::Animation], S::AnimationDuration, V::ScaledAnimation { factor: 0.4 }),
];

const VERY_LOW_RULES: &[Rule] = &[
    rule(&[P::BoxShadow], S::BoxShadow, V::Fixed("none")),
    rule(&[P::AnyFilter], S::Filter, V::Fixed("none")),
    rule(&[P::BackdropFilter], S::BackdropFilter, V::Fixed("none")),
    rule(&[P::GlassLike], S::BackgroundColor, V::Fixed("rgb(255, 255, 255)")),
    rule(&[P::GlassLike], S::Border, V::Fixed("1px solid rgba(15, 23, 42, 0.12)")),
    rule(&[P::Transform], S::Transform, V::Fixed("none")),
    rule(&[P::Animation], S::Animation, V::Fixed("none")),
    rule(&[P::Transition], S::Transition, V::Fixed("none")),
];

/// The inline ruleset of a tier. `High` has none.
pub fn ruleset(tier: CapabilityTier) -> &'static [Rule] {
    match tier {
        CapabilityTier::High => &[],
        CapabilityTier::Mid => MID_RULES,
        CapabilityTier::Low => LOW_RULES,
        CapabilityTier::VeryLow => VERY_LOW_RULES,
    }
}

/// One inline declaration to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleMutation {
    pub node: NodeId,
    pub property: StyleProperty,
    pub value: String,
}

/// Desired inline state for `tier`, one entry per `(node, property)`, sorted.
/// Later rows of a ruleset win over earlier ones for the same pair.
pub fn plan_mutations(tier: CapabilityTier, elements: &[HeavyElement]) -> Vec<StyleMutation> {
    let rules = ruleset(tier);
    let mut planned: BTreeMap<(NodeId, StyleProperty), String> = BTreeMap::new();

    for element in elements {
        for rule in rules {
            if !rule.when.iter().all(|p| p.matches(element)) {
                continue;
            }
            if let Some(value) = rule.value.resolve(element) {
                planned.insert((element.node, rule.property), value);
            }
        }
    }

    planned
        .into_iter()
        .map(|((node, property), value)| StyleMutation {
            node,
            property,
            value,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ComputedStyle, EffectFacts, Rect};

    fn heavy(node: usize, side: f64, style: ComputedStyle) -> HeavyElement {
        let rect = Rect::new(0.0, 0.0, side, side);
        HeavyElement {
            node: NodeId(node),
            facts: EffectFacts::from_style(&style),
            rect,
            area: rect.area(),
            score: 1.0,
        }
    }

    fn value_of(plan: &[StyleMutation], node: usize, property: StyleProperty) -> Option<&str> {
        plan.iter()
            .find(|m| m.node == NodeId(node) && m.property == property)
            .map(|m| m.value.as_str())
    }

    fn glass_card() -> ComputedStyle {
        ComputedStyle {
            backdrop_filter: "blur(20px) saturate(1.4)".into(),
            box_shadow: "rgba(0, 0, 0, 0.1) 0px 8px 32px 0px".into(),
            ..ComputedStyle::default()
        }
    }

    #[test]
    fn test_high_plans_nothing() {
        let elements = vec![heavy(0, 100.0, glass_card())];
        assert!(plan_mutations(CapabilityTier::High, &elements).is_empty());
    }

    #[test]
    fn test_mid_softens_glass() {
        let elements = vec![heavy(0, 100.0, glass_card())];
        let plan = plan_mutations(CapabilityTier::Mid, &elements);
        assert_eq!(
            value_of(&plan, 0, StyleProperty::BackdropFilter),
            Some("blur(4px) saturate(1.4)")
        );
        assert_eq!(
            value_of(&plan, 0, StyleProperty::BoxShadow),
            Some("0 2px 8px rgba(0, 0, 0, 0.036)")
        );
        assert_eq!(
            value_of(&plan, 0, StyleProperty::BackgroundColor),
            Some("rgba(255, 255, 255, 0.75)")
        );
    }

    #[test]
    fn test_mid_blur_scaled_and_capped() {
        let elements = vec![
            heavy(0, 100.0, ComputedStyle { filter: "blur(5px)".into(), ..ComputedStyle::default() }),
            heavy(1, 100.0, ComputedStyle { filter: "blur(40px)".into(), ..ComputedStyle::default() }),
        ];
        let plan = plan_mutations(CapabilityTier::Mid, &elements);
        assert_eq!(value_of(&plan, 0, StyleProperty::Filter), Some("blur(1.5px)"));
        assert_eq!(value_of(&plan, 1, StyleProperty::Filter), Some("blur(3px)"));
    }

    #[test]
    fn test_mid_transforms_only_3d_or_large() {
        let flat = ComputedStyle {
            transform: "matrix(1, 0, 0, 1, 0, -4)".into(),
            ..ComputedStyle::default()
        };
        let deep = ComputedStyle {
            transform: "matrix3d(1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1)".into(),
            ..ComputedStyle::default()
        };
        let elements = vec![
            heavy(0, 100.0, flat.clone()),
            heavy(1, 100.0, deep),
            heavy(2, 500.0, flat),
        ];
        let plan = plan_mutations(CapabilityTier::Mid, &elements);
        assert_eq!(value_of(&plan, 0, StyleProperty::Transform), None);
        assert_eq!(value_of(&plan, 1, StyleProperty::Transform), Some("none"));
        assert_eq!(value_of(&plan, 2, StyleProperty::Transform), Some("none"));
    }

    #[test]
    fn test_low_removes_transforms_more_broadly() {
        let flat = ComputedStyle {
            transform: "matrix(1, 0, 0, 1, 0, -4)".into(),
            ..ComputedStyle::default()
        };
        let elements = vec![heavy(0, 300.0, flat.clone()), heavy(1, 100.0, flat)];
        let mid = plan_mutations(CapabilityTier::Mid, &elements);
        let low = plan_mutations(CapabilityTier::Low, &elements);
        assert_eq!(value_of(&mid, 0, StyleProperty::Transform), None);
        assert_eq!(value_of(&low, 0, StyleProperty::Transform), Some("none"));
        assert_eq!(value_of(&low, 1, StyleProperty::Transform), None);
    }

    #[test]
    fn test_animation_factor_by_tier_and_area() {
        let anim = ComputedStyle {
            animation_name: "float".into(),
            animation_duration: "10s".into(),
            ..ComputedStyle::default()
        };
        let elements = vec![heavy(0, 100.0, anim.clone()), heavy(1, 500.0, anim)];
        let mid = plan_mutations(CapabilityTier::Mid, &elements);
        let low = plan_mutations(CapabilityTier::Low, &elements);
        assert_eq!(value_of(&mid, 0, StyleProperty::AnimationDuration), Some("6s"));
        assert_eq!(value_of(&mid, 1, StyleProperty::AnimationDuration), Some("2.4s"));
        assert_eq!(value_of(&low, 0, StyleProperty::AnimationDuration), Some("4s"));
    }

    #[test]
    fn test_low_backdrop_near_zero_and_more_opaque() {
        let elements = vec![heavy(0, 100.0, glass_card())];
        let plan = plan_mutations(CapabilityTier::Low, &elements);
        assert_eq!(
            value_of(&plan, 0, StyleProperty::BackdropFilter),
            Some("blur(1px) saturate(1.4)")
        );
        assert_eq!(
            value_of(&plan, 0, StyleProperty::BackgroundColor),
            Some("rgba(255, 255, 255, 0.9)")
        );
    }

    #[test]
    fn test_very_low_flattens_everything() {
        let everything = ComputedStyle {
            backdrop_filter: "blur(16px)".into(),
            filter: "blur(2px)".into(),
            box_shadow: "0 0 8px black".into(),
            transform: "rotate(2deg)".into(),
            animation_name: "spin".into(),
            animation_duration: "2s".into(),
            transition_duration: "0.3s".into(),
            ..ComputedStyle::default()
        };
        let plan = plan_mutations(CapabilityTier::VeryLow, &[heavy(0, 100.0, everything)]);
        for property in [
            StyleProperty::BackdropFilter,
            StyleProperty::Filter,
            StyleProperty::BoxShadow,
            StyleProperty::Transform,
            StyleProperty::Animation,
            StyleProperty::Transition,
        ] {
            assert_eq!(value_of(&plan, 0, property), Some("none"), "{property:?}");
        }
        assert_eq!(
            value_of(&plan, 0, StyleProperty::BackgroundColor),
            Some("rgb(255, 255, 255)")
        );
        assert!(value_of(&plan, 0, StyleProperty::Border).is_some());
    }

    #[test]
    fn test_plan_is_sorted_and_unique() {
        let elements = vec![heavy(3, 100.0, glass_card()), heavy(1, 100.0, glass_card())];
        let plan = plan_mutations(CapabilityTier::VeryLow, &elements);
        let keys: Vec<_> = plan.iter().map(|m| (m.node, m.property)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
    }
}
