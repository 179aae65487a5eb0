//! Raw references into a scene graph.
//!
//! Handles are plain copyable identifiers. They carry no borrow of the scene;
//! whether a handle still points at something is checked by the scene on use.

use std::fmt;

/// Identifier of a node.
///
/// Ids are never reused within one scene, so a removed and later restored
/// node keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index of this node.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Index of an attribute within its node's attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttrKey(pub u32);

/// An attribute as instantiated on a specific node.
///
/// On an array attribute, `index` selects one logical element; `None`
/// addresses the array as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Plug {
    pub node: NodeId,
    pub attr: AttrKey,
    pub index: Option<u32>,
}

impl Plug {
    pub fn new(node: NodeId, attr: AttrKey) -> Self {
        Self {
            node,
            attr,
            index: None,
        }
    }

    /// The element at logical `index` of this array plug.
    #[must_use]
    pub fn element(self, index: u32) -> Self {
        Self {
            index: Some(index),
            ..self
        }
    }

    /// The array this element belongs to, or the plug itself.
    #[must_use]
    pub fn array(self) -> Self {
        Self {
            index: None,
            ..self
        }
    }

    /// Both plugs address the same attribute, elements included.
    pub fn same_attribute(&self, other: &Plug) -> bool {
        self.node == other.node && self.attr == other.attr
    }
}

/// Kind of sub-part addressed by a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Vertex,
    Edge,
    Face,
}

impl ComponentKind {
    /// Token used in component names, e.g. `vtx` in `mesh1.vtx[3]`.
    pub fn token(self) -> &'static str {
        match self {
            Self::Vertex => "vtx",
            Self::Edge => "e",
            Self::Face => "f",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "vtx" => Some(Self::Vertex),
            "e" => Some(Self::Edge),
            "f" => Some(Self::Face),
            _ => None,
        }
    }
}

/// An addressable sub-part of a shape node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentId {
    pub node: NodeId,
    pub kind: ComponentKind,
    pub index: u32,
}

/// A reference to any scene object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectHandle {
    Node(NodeId),
    Attribute(Plug),
    Component(ComponentId),
}

impl ObjectHandle {
    /// The node this object lives on.
    pub fn node(&self) -> NodeId {
        match self {
            Self::Node(node) => *node,
            Self::Attribute(plug) => plug.node,
            Self::Component(component) => component.node,
        }
    }
}

/// Path from a root dag node down to a leaf, root first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DagPath {
    nodes: Vec<NodeId>,
}

impl DagPath {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self { nodes }
    }

    /// The node the path ends at.
    pub fn leaf(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Raw handle as handed over by selection lists and external callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawHandle {
    Object(ObjectHandle),
    Plug(Plug),
    DagPath(DagPath),
}

/// What a name resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTarget {
    Node(NodeId),
    Plug(Plug),
    Component(DagPath, ComponentId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_tokens_round_trip() {
        for kind in [ComponentKind::Vertex, ComponentKind::Edge, ComponentKind::Face] {
            assert_eq!(ComponentKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(ComponentKind::from_token("cv"), None);
    }

    #[test]
    fn object_handle_node() {
        let node = NodeId::from_raw(4);
        let plug = Plug::new(node, AttrKey(2));
        assert_eq!(ObjectHandle::Attribute(plug).node(), node);
        assert_eq!(node.to_string(), "node#4");
    }

    #[test]
    fn element_plugs_share_their_attribute() {
        let plug = Plug::new(NodeId::from_raw(1), AttrKey(3));
        let element = plug.element(2);
        assert_ne!(plug, element);
        assert!(element.same_attribute(&plug));
        assert_eq!(element.array(), plug);
        assert_eq!(element.index, Some(2));
    }

    #[test]
    fn dag_path_leaf() {
        let path = DagPath::new(vec![NodeId::from_raw(0), NodeId::from_raw(3)]);
        assert_eq!(path.leaf(), Some(NodeId::from_raw(3)));
        assert_eq!(path.len(), 2);
        assert!(DagPath::new(Vec::new()).leaf().is_none());
    }
}
