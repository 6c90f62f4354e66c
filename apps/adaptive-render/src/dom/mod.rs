//! The rendered document, seen through the handful of operations the engine
//! needs: read resolved style and geometry, write inline style, toggle classes,
//! inject one stylesheet.

pub mod memory;
pub mod scan;

use serde::{Deserialize, Serialize};

use crate::errors::DomError;

pub use memory::{MemoryDocument, MemoryElement};
pub use scan::{scan_document, DomScan, EffectFacts, HeavinessWeights, HeavyElement};

/// Opaque handle to an element, valid for the lifetime of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Viewport-relative bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// On-screen area, never below 1 so degenerate boxes still score.
    pub fn area(&self) -> f64 {
        (self.width * self.height).max(1.0)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// The resolved-style subset the engine inspects. Values are CSS text exactly
/// as `getComputedStyle` reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub backdrop_filter: String,
    pub filter: String,
    pub box_shadow: String,
    pub transform: String,
    pub animation_name: String,
    pub animation_duration: String,
    pub transition_duration: String,
    pub background_color: String,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            backdrop_filter: "none".into(),
            filter: "none".into(),
            box_shadow: "none".into(),
            transform: "none".into(),
            animation_name: "none".into(),
            animation_duration: "0s".into(),
            transition_duration: "0s".into(),
            background_color: "rgba(0, 0, 0, 0)".into(),
        }
    }
}

/// Inline style properties the engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StyleProperty {
    BackdropFilter,
    Filter,
    BoxShadow,
    Transform,
    Animation,
    AnimationDuration,
    Transition,
    BackgroundColor,
    Border,
}

impl StyleProperty {
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::BackdropFilter => "backdrop-filter",
            Self::Filter => "filter",
            Self::BoxShadow => "box-shadow",
            Self::Transform => "transform",
            Self::Animation => "animation",
            Self::AnimationDuration => "animation-duration",
            Self::Transition => "transition",
            Self::BackgroundColor => "background-color",
            Self::Border => "border",
        }
    }
}

/// Host document surface.
///
/// Read calls may fail for a single element (detached node, style access
/// throwing); callers skip that element and carry on.
pub trait Document {
    /// Elements worth inspecting for expensive effects.
    fn candidates(&mut self) -> Vec<NodeId>;

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle, DomError>;

    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError>;

    fn viewport(&self) -> Rect;

    fn inline_style(&self, node: NodeId, property: StyleProperty)
        -> Result<Option<String>, DomError>;

    /// `None` removes the inline declaration.
    fn set_inline_style(
        &mut self,
        node: NodeId,
        property: StyleProperty,
        value: Option<&str>,
    ) -> Result<(), DomError>;

    fn set_class(&mut self, node: NodeId, class: &str, enabled: bool) -> Result<(), DomError>;

    fn root_classes(&self) -> Vec<String>;

    fn set_root_class(&mut self, class: &str, enabled: bool);

    fn has_stylesheet(&self, id: &str) -> bool;

    fn inject_stylesheet(&mut self, id: &str, css: &str) -> Result<(), DomError>;
}
