//! Wrapper objects handed out by the factory.
//!
//! Wrappers are flat, kind-tagged handles. They hold no scene state and are
//! never cached; two wrappers are equal when they refer to the same object.
//! Every accessor goes through a [`SceneContext`](crate::SceneContext).

mod attribute;
mod component;
mod node;

pub use attribute::{Attribute, PlugFlagOp};
pub use component::Component;
pub use node::{Node, NodeLockOp};

use plugwork_scene::ObjectHandle;

use crate::error::{EngineError, EngineResult};
use crate::factory::ObjectKind;

/// Any wrapped scene object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneObject {
    Node(Node),
    Attribute(Attribute),
    Component(Component),
}

impl SceneObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Node(node) => node.kind(),
            Self::Attribute(attribute) => attribute.kind(),
            Self::Component(_) => ObjectKind::Component,
        }
    }

    pub fn handle(&self) -> ObjectHandle {
        match self {
            Self::Node(node) => ObjectHandle::Node(node.id()),
            Self::Attribute(attribute) => ObjectHandle::Attribute(attribute.plug()),
            Self::Component(component) => ObjectHandle::Component(*component.id()),
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&Attribute> {
        match self {
            Self::Attribute(attribute) => Some(attribute),
            _ => None,
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Self::Component(component) => Some(component),
            _ => None,
        }
    }

    pub fn into_node(self) -> EngineResult<Node> {
        match self {
            Self::Node(node) => Ok(node),
            other => Err(other.wrong_kind("node")),
        }
    }

    pub fn into_attribute(self) -> EngineResult<Attribute> {
        match self {
            Self::Attribute(attribute) => Ok(attribute),
            other => Err(other.wrong_kind("attribute")),
        }
    }

    pub fn into_component(self) -> EngineResult<Component> {
        match self {
            Self::Component(component) => Ok(component),
            other => Err(other.wrong_kind("component")),
        }
    }

    fn wrong_kind(&self, expected: &'static str) -> EngineError {
        EngineError::WrongKind {
            expected,
            actual: self.kind(),
        }
    }
}
