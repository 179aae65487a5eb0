//! Explicit registry of wrapper constructors.

use std::collections::BTreeMap;

use plugwork_scene::{ObjectHandle, SceneGraph};

use super::classify::{ObjectKind, classify};
use super::selection::FromSelection;
use super::{FactoryError, FactoryInput, FactoryResult, HandleSet};
use crate::objects::{Attribute, Component, Node, SceneObject};

/// Builds the wrapper for one classified object.
pub type Constructor = fn(&HandleSet, ObjectKind) -> FactoryResult<SceneObject>;

/// Maps object kinds to the constructors that wrap them.
///
/// Registration is an explicit setup step; nothing registers itself. A later
/// registration for a kind replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    constructors: BTreeMap<ObjectKind, Constructor>,
}

impl ObjectRegistry {
    /// An empty registry; every lookup fails with `NotImplemented`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the standard constructor for every kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in ObjectKind::ALL {
            let constructor: Constructor = match kind {
                ObjectKind::DependencyNode
                | ObjectKind::DagNode
                | ObjectKind::Transform
                | ObjectKind::Joint
                | ObjectKind::ObjectSet => construct_node,
                ObjectKind::Component => construct_component,
                _ => construct_attribute,
            };
            registry.register(kind, constructor);
        }
        registry
    }

    pub fn register(&mut self, kind: ObjectKind, constructor: Constructor) {
        if self.constructors.insert(kind, constructor).is_some() {
            log::debug!("Replaced constructor for {kind}");
        }
    }

    pub fn unregister(&mut self, kind: ObjectKind) -> Option<Constructor> {
        self.constructors.remove(&kind)
    }

    pub fn is_registered(&self, kind: ObjectKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Registered kinds in a stable order.
    pub fn kinds(&self) -> impl Iterator<Item = ObjectKind> + '_ {
        self.constructors.keys().copied()
    }

    /// Resolves `input` and wraps it in its most specific registered type.
    pub fn create<S: SceneGraph>(
        &self,
        scene: &S,
        input: impl Into<FactoryInput>,
    ) -> FactoryResult<SceneObject> {
        let handles = HandleSet::normalize(scene, input.into())?;
        let object = handles
            .object()
            .ok_or_else(|| FactoryError::InvalidInput("nothing to wrap".into()))?;
        let functions = scene.object_functions(object)?;
        let kind =
            classify(functions).ok_or_else(|| FactoryError::UnregisteredType(format!("{functions:?}")))?;
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or(FactoryError::NotImplemented(kind))?;
        constructor(&handles, kind)
    }

    /// Wraps selection items one at a time, as the iterator is advanced.
    pub fn from_selection<'a, S, I>(&'a self, scene: &'a S, items: I) -> FromSelection<'a, S, I::IntoIter>
    where
        S: SceneGraph,
        I: IntoIterator,
        I::Item: Into<FactoryInput>,
    {
        FromSelection::new(self, scene, items.into_iter())
    }
}

fn construct_node(handles: &HandleSet, kind: ObjectKind) -> FactoryResult<SceneObject> {
    match handles.object() {
        Some(ObjectHandle::Node(node)) => Ok(SceneObject::Node(Node::new(*node, kind))),
        other => Err(FactoryError::InvalidInput(format!("{other:?} is not a node"))),
    }
}

fn construct_attribute(handles: &HandleSet, kind: ObjectKind) -> FactoryResult<SceneObject> {
    match handles.object() {
        Some(ObjectHandle::Attribute(plug)) => Ok(SceneObject::Attribute(Attribute::new(*plug, kind))),
        other => Err(FactoryError::InvalidInput(format!(
            "{other:?} is not an attribute"
        ))),
    }
}

fn construct_component(handles: &HandleSet, _kind: ObjectKind) -> FactoryResult<SceneObject> {
    match (handles.object(), handles.dag_path()) {
        (Some(ObjectHandle::Component(component)), Some(path)) => Ok(SceneObject::Component(
            Component::new(path.clone(), *component),
        )),
        (other, _) => Err(FactoryError::InvalidInput(format!(
            "{other:?} is not a component with a dag path"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use plugwork_scene::MemoryScene;

    use super::*;

    fn as_dependency_node(handles: &HandleSet, _kind: ObjectKind) -> FactoryResult<SceneObject> {
        construct_node(handles, ObjectKind::DependencyNode)
    }

    #[test]
    fn defaults_cover_every_kind() {
        let registry = ObjectRegistry::with_defaults();
        assert_eq!(registry.kinds().count(), ObjectKind::ALL.len());
    }

    #[test]
    fn same_input_same_kind() {
        let mut scene = MemoryScene::new();
        scene.create_node("joint", Some("knee"), None).unwrap();
        let registry = ObjectRegistry::with_defaults();
        let first = registry.create(&scene, "knee").unwrap();
        let second = registry.create(&scene, "knee").unwrap();
        assert_eq!(first.kind(), ObjectKind::Joint);
        assert_eq!(first.kind(), second.kind());
        assert_eq!(first, second);
    }

    #[test]
    fn last_registration_wins() {
        let mut scene = MemoryScene::new();
        scene.create_node("transform", Some("root"), None).unwrap();
        let mut registry = ObjectRegistry::with_defaults();
        registry.register(ObjectKind::Transform, as_dependency_node);
        let object = registry.create(&scene, "root").unwrap();
        assert_eq!(object.kind(), ObjectKind::DependencyNode);
    }

    #[test]
    fn missing_constructor_is_reported() {
        let mut scene = MemoryScene::new();
        scene.create_node("network", Some("net"), None).unwrap();
        let mut registry = ObjectRegistry::with_defaults();
        registry.unregister(ObjectKind::DependencyNode);
        assert!(matches!(
            registry.create(&scene, "net"),
            Err(FactoryError::NotImplemented(ObjectKind::DependencyNode))
        ));
        assert!(matches!(
            ObjectRegistry::new().create(&scene, "net.message"),
            Err(FactoryError::NotImplemented(ObjectKind::MessageAttribute))
        ));
    }

    #[test]
    fn component_needs_shape() {
        let mut scene = MemoryScene::new();
        scene.create_node("mesh", Some("body"), None).unwrap();
        let registry = ObjectRegistry::with_defaults();
        let object = registry.create(&scene, "body.vtx[4]").unwrap();
        assert_eq!(object.kind(), ObjectKind::Component);
    }
}
