//! Overlay elements drawn on top of the map.
//!
//! Overlays are described as a small element tree: each element has a kind, a property map
//! and children. Before the overlays are displayed the [`OverlayDistributor`] merges the
//! current map center and range into the properties of every direct child element.

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::geometry::GeoCenter;
use crate::simvar::SimVarSource;

/// Property carrying the map center.
pub const CENTER_PROP: &str = "centerLla";
/// Property carrying the visible range.
pub const RANGE_PROP: &str = "range";

/// Overlay element: kind, properties and nested content.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayElement {
    kind: String,
    props: Map<String, Value>,
    children: Vec<OverlayNode>,
}

impl OverlayElement {
    /// Creates an element without properties and children.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            props: Map::new(),
            children: Vec::new(),
        }
    }

    /// Adds or replaces a property.
    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Appends a child node.
    pub fn with_child(mut self, child: impl Into<OverlayNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Element kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Property by name.
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// All properties.
    pub fn props(&self) -> &Map<String, Value> {
        &self.props
    }

    /// Nested content.
    pub fn children(&self) -> &[OverlayNode] {
        &self.children
    }

    /// Map center injected by the distributor, if any.
    pub fn center(&self) -> Option<GeoCenter> {
        serde_json::from_value(self.prop(CENTER_PROP)?.clone()).ok()
    }

    /// Visible range injected by the distributor, if any.
    pub fn range(&self) -> Option<f64> {
        self.prop(RANGE_PROP)?.as_f64()
    }

    /// Copy of the element with the given properties merged in.
    ///
    /// Merged properties replace existing ones with the same name. Other properties and the
    /// children are kept as they are.
    pub fn merged(&self, extra: &Map<String, Value>) -> Self {
        let mut element = self.clone();
        for (name, value) in extra {
            element.props.insert(name.clone(), value.clone());
        }
        element
    }
}

/// Node of overlay content.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayNode {
    /// Element that accepts properties.
    Element(OverlayElement),
    /// Plain text.
    Text(String),
    /// Group of nodes without an element of its own.
    Fragment(Vec<OverlayNode>),
}

impl OverlayNode {
    /// Returns the element if the node is one.
    pub fn as_element(&self) -> Option<&OverlayElement> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<OverlayElement> for OverlayNode {
    fn from(element: OverlayElement) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for OverlayNode {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for OverlayNode {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Overlays prepared for display together with simulation variable access.
pub struct OverlayScope {
    sim_vars: Rc<dyn SimVarSource>,
    children: Vec<OverlayNode>,
}

impl OverlayScope {
    /// Overlay content with positioning properties merged in.
    pub fn children(&self) -> &[OverlayNode] {
        &self.children
    }

    /// Simulation variables available to the overlays.
    pub fn sim_vars(&self) -> &dyn SimVarSource {
        self.sim_vars.as_ref()
    }

    /// Shared handle to the simulation variables, for overlays that subscribe to them.
    pub fn sim_vars_handle(&self) -> Rc<dyn SimVarSource> {
        self.sim_vars.clone()
    }
}

impl fmt::Debug for OverlayScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayScope")
            .field("children", &self.children)
            .finish()
    }
}

/// Hands the map position to overlay content.
#[derive(Clone)]
pub struct OverlayDistributor {
    sim_vars: Rc<dyn SimVarSource>,
}

impl OverlayDistributor {
    /// Creates a distributor giving overlays access to `sim_vars`.
    pub fn new(sim_vars: Rc<dyn SimVarSource>) -> Self {
        Self { sim_vars }
    }

    /// Prepares `children` for display.
    ///
    /// Every direct child element gets copies of `center` and `range`. Text and fragments
    /// are passed through unchanged, and the input nodes are not modified.
    pub fn distribute(
        &self,
        children: &[OverlayNode],
        center: GeoCenter,
        range: f64,
    ) -> OverlayScope {
        let extra = position_props(center, range);
        let children = children
            .iter()
            .map(|child| match child {
                OverlayNode::Element(element) => OverlayNode::Element(element.merged(&extra)),
                other => other.clone(),
            })
            .collect();

        OverlayScope {
            sim_vars: self.sim_vars.clone(),
            children,
        }
    }
}

impl fmt::Debug for OverlayDistributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverlayDistributor").finish_non_exhaustive()
    }
}

fn position_props(center: GeoCenter, range: f64) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert(
        CENTER_PROP.to_owned(),
        serde_json::json!({ "lat": center.lat, "long": center.long }),
    );
    props.insert(RANGE_PROP.to_owned(), serde_json::json!(range));
    props
}
