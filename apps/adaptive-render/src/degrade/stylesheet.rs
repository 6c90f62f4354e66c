//! Tier-scoped sitewide CSS, injected once per page.
//!
//! Every block is keyed off the root marker class, so switching tiers only
//! swaps the class; the sheet itself never changes after injection.

use crate::tier::CapabilityTier;

pub const STYLESHEET_ID: &str = "adaptive-render-tiers";

/// Class toggled on heavy elements that lie entirely outside the viewport.
pub const OFFSCREEN_CLASS: &str = "ar-offscreen";

const ANIMATED_GRADIENTS: &str = ".animated-gradient, .bg-animated, [class*=\"gradient-anim\"]";
const GLASS: &str = ".glass, .glass-card, .glass-panel, [class*=\"glass\"]";
const HOVERABLE: &str = "a:hover, button:hover, [role=\"button\"]:hover, .card:hover, .btn:hover";
const EVERYTHING: &str = "*, *::before, *::after";
const OFFSCREEN: &str = ".ar-offscreen";

const OFFSCREEN_DECLS: &str = "filter: none !important; backdrop-filter: none !important; \
-webkit-backdrop-filter: none !important; box-shadow: none !important; animation: none !important;";

/// One tier-scoped block: `html.<marker> <selector> { <declarations> }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierCss {
    pub tier: CapabilityTier,
    pub selector: &'static str,
    pub declarations: &'static str,
}

const fn css(tier: CapabilityTier, selector: &'static str, declarations: &'static str) -> TierCss {
    TierCss {
        tier,
        selector,
        declarations,
    }
}

use CapabilityTier::{Low, Mid, VeryLow};

pub const TIER_CSS: &[TierCss] = &[
    css(Mid, ANIMATED_GRADIENTS, "animation-duration: 24s !important;"),
    css(Mid, OFFSCREEN, OFFSCREEN_DECLS),
    css(Low, ANIMATED_GRADIENTS, "animation-duration: 40s !important;"),
    css(Low, GLASS, "backdrop-filter: blur(2px) !important; -webkit-backdrop-filter: blur(2px) !important;"),
    css(Low, HOVERABLE, "transform: none !important; box-shadow: none !important;"),
    css(Low, OFFSCREEN, OFFSCREEN_DECLS),
    css(VeryLow, ANIMATED_GRADIENTS, "animation: none !important; background-size: auto !important;"),
    css(
        VeryLow,
        GLASS,
        "backdrop-filter: none !important; -webkit-backdrop-filter: none !important; \
background: #ffffff !important; border: 1px solid rgba(15, 23, 42, 0.12) !important;",
    ),
    css(VeryLow, EVERYTHING, "animation: none !important; transition: none !important;"),
    css(VeryLow, HOVERABLE, "transform: none !important; box-shadow: none !important; filter: none !important;"),
    css(VeryLow, OFFSCREEN, OFFSCREEN_DECLS),
];

/// Prefixes each comma-separated selector with the tier's root class.
fn scoped_selector(tier: CapabilityTier, selector: &str) -> String {
    selector
        .split(',')
        .map(|part| format!("html.{} {}", tier.marker_class(), part.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the full sheet. Deterministic, so re-rendering yields the same text.
pub fn render_stylesheet(rules: &[TierCss]) -> String {
    rules
        .iter()
        .map(|rule| {
            format!(
                "{} {{ {} }}",
                scoped_selector(rule.tier, rule.selector),
                rule.declarations
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
