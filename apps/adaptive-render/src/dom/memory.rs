//! In-memory document used by native hosts and tests.
//!
//! Resolution follows the browser: an element's computed style is its base
//! (stylesheet) style with inline declarations layered on top.

use std::collections::{BTreeMap, BTreeSet};

use super::{ComputedStyle, Document, NodeId, Rect, StyleProperty};
use crate::errors::DomError;

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryElement {
    pub classes: BTreeSet<String>,
    pub base_style: ComputedStyle,
    pub inline: BTreeMap<StyleProperty, String>,
    pub rect: Rect,
    pub detached: bool,
}

impl MemoryElement {
    pub fn new(rect: Rect) -> Self {
        Self {
            classes: BTreeSet::new(),
            base_style: ComputedStyle::default(),
            inline: BTreeMap::new(),
            rect,
            detached: false,
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn backdrop_filter(mut self, value: &str) -> Self {
        self.base_style.backdrop_filter = value.to_string();
        self
    }

    pub fn filter(mut self, value: &str) -> Self {
        self.base_style.filter = value.to_string();
        self
    }

    pub fn box_shadow(mut self, value: &str) -> Self {
        self.base_style.box_shadow = value.to_string();
        self
    }

    pub fn transform(mut self, value: &str) -> Self {
        self.base_style.transform = value.to_string();
        self
    }

    pub fn animation(mut self, name: &str, duration: &str) -> Self {
        self.base_style.animation_name = name.to_string();
        self.base_style.animation_duration = duration.to_string();
        self
    }

    pub fn transition(mut self, duration: &str) -> Self {
        self.base_style.transition_duration = duration.to_string();
        self
    }

    pub fn background(mut self, value: &str) -> Self {
        self.base_style.background_color = value.to_string();
        self
    }

    pub fn inline_style(mut self, property: StyleProperty, value: &str) -> Self {
        self.inline.insert(property, value.to_string());
        self
    }

    fn resolved_style(&self) -> ComputedStyle {
        let mut style = self.base_style.clone();
        for (property, value) in &self.inline {
            match property {
                StyleProperty::BackdropFilter => style.backdrop_filter = value.clone(),
                StyleProperty::Filter => style.filter = value.clone(),
                StyleProperty::BoxShadow => style.box_shadow = value.clone(),
                StyleProperty::Transform => style.transform = value.clone(),
                StyleProperty::Animation if value == "none" => {
                    style.animation_name = "none".into();
                }
                StyleProperty::Animation => {}
                StyleProperty::AnimationDuration => style.animation_duration = value.clone(),
                StyleProperty::Transition if value == "none" => {
                    style.transition_duration = "0s".into();
                }
                StyleProperty::Transition => {}
                StyleProperty::BackgroundColor => style.background_color = value.clone(),
                StyleProperty::Border => {}
            }
        }
        style
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDocument {
    elements: Vec<MemoryElement>,
    root_classes: BTreeSet<String>,
    stylesheets: BTreeMap<String, String>,
    viewport: Rect,
}

impl MemoryDocument {
    pub fn new(viewport: Rect) -> Self {
        Self {
            elements: Vec::new(),
            root_classes: BTreeSet::new(),
            stylesheets: BTreeMap::new(),
            viewport,
        }
    }

    pub fn push(&mut self, element: MemoryElement) -> NodeId {
        self.elements.push(element);
        NodeId(self.elements.len() - 1)
    }

    pub fn element(&self, node: NodeId) -> Option<&MemoryElement> {
        self.elements.get(node.0)
    }

    pub fn detach(&mut self, node: NodeId) {
        if let Some(element) = self.elements.get_mut(node.0) {
            element.detached = true;
        }
    }

    pub fn inline(&self, node: NodeId, property: StyleProperty) -> Option<&str> {
        self.element(node)
            .and_then(|element| element.inline.get(&property))
            .map(String::as_str)
    }

    pub fn stylesheet(&self, id: &str) -> Option<&str> {
        self.stylesheets.get(id).map(String::as_str)
    }

    pub fn stylesheet_count(&self) -> usize {
        self.stylesheets.len()
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    fn live(&self, node: NodeId) -> Result<&MemoryElement, DomError> {
        self.elements
            .get(node.0)
            .filter(|element| !element.detached)
            .ok_or(DomError::Detached(node.0))
    }

    fn live_mut(&mut self, node: NodeId) -> Result<&mut MemoryElement, DomError> {
        self.elements
            .get_mut(node.0)
            .filter(|element| !element.detached)
            .ok_or(DomError::Detached(node.0))
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new(Rect::new(0.0, 0.0, 1280.0, 800.0))
    }
}

impl Document for MemoryDocument {
    fn candidates(&mut self) -> Vec<NodeId> {
        (0..self.elements.len()).map(NodeId).collect()
    }

    fn computed_style(&self, node: NodeId) -> Result<ComputedStyle, DomError> {
        self.live(node).map(MemoryElement::resolved_style)
    }

    fn bounding_rect(&self, node: NodeId) -> Result<Rect, DomError> {
        self.live(node).map(|element| element.rect)
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn inline_style(
        &self,
        node: NodeId,
        property: StyleProperty,
    ) -> Result<Option<String>, DomError> {
        Ok(self.live(node)?.inline.get(&property).cloned())
    }

    fn set_inline_style(
        &mut self,
        node: NodeId,
        property: StyleProperty,
        value: Option<&str>,
    ) -> Result<(), DomError> {
        let element = self.live_mut(node)?;
        match value {
            Some(value) => {
                element.inline.insert(property, value.to_string());
            }
            None => {
                element.inline.remove(&property);
            }
        }
        Ok(())
    }

    fn set_class(&mut self, node: NodeId, class: &str, enabled: bool) -> Result<(), DomError> {
        let element = self.live_mut(node)?;
        if enabled {
            element.classes.insert(class.to_string());
        } else {
            element.classes.remove(class);
        }
        Ok(())
    }

    fn root_classes(&self) -> Vec<String> {
        self.root_classes.iter().cloned().collect()
    }

    fn set_root_class(&mut self, class: &str, enabled: bool) {
        if enabled {
            self.root_classes.insert(class.to_string());
        } else {
            self.root_classes.remove(class);
        }
    }

    fn has_stylesheet(&self, id: &str) -> bool {
        self.stylesheets.contains_key(id)
    }

    fn inject_stylesheet(&mut self, id: &str, css: &str) -> Result<(), DomError> {
        self.stylesheets.insert(id.to_string(), css.to_string());
        Ok(())
    }
}
