//! Resolution of names and raw handles to wrapper objects.
//!
//! Input of any form is first normalized to a [`HandleSet`], classified by
//! the function sets the scene reports, and finally built by the constructor
//! an [`ObjectRegistry`] holds for that kind.

mod classify;
mod registry;
mod selection;

pub use classify::{Coarse, ObjectKind, classify, coarse, fine};
pub use registry::{Constructor, ObjectRegistry};
pub use selection::FromSelection;

use plugwork_scene::{
    ComponentId, DagPath, NameTarget, NodeId, ObjectHandle, Plug, RawHandle, SceneError,
    SceneGraph,
};

/// Error type for object resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FactoryError {
    /// No category matches the object's function sets.
    #[error("unregistered object type ({0})")]
    UnregisteredType(String),
    /// Classified, but nothing constructs this kind.
    #[error("no constructor registered for {0}")]
    NotImplemented(ObjectKind),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type FactoryResult<T = ()> = Result<T, FactoryError>;

/// Anything the factory accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryInput {
    Name(String),
    Component(DagPath, ComponentId),
    Handles(Vec<RawHandle>),
}

impl From<&str> for FactoryInput {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for FactoryInput {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<NodeId> for FactoryInput {
    fn from(node: NodeId) -> Self {
        Self::Handles(vec![RawHandle::Object(ObjectHandle::Node(node))])
    }
}

impl From<Plug> for FactoryInput {
    fn from(plug: Plug) -> Self {
        Self::Handles(vec![RawHandle::Plug(plug)])
    }
}

impl From<ObjectHandle> for FactoryInput {
    fn from(handle: ObjectHandle) -> Self {
        Self::Handles(vec![RawHandle::Object(handle)])
    }
}

impl From<DagPath> for FactoryInput {
    fn from(path: DagPath) -> Self {
        Self::Handles(vec![RawHandle::DagPath(path)])
    }
}

impl From<(DagPath, ComponentId)> for FactoryInput {
    fn from((path, component): (DagPath, ComponentId)) -> Self {
        Self::Component(path, component)
    }
}

impl From<Vec<RawHandle>> for FactoryInput {
    fn from(handles: Vec<RawHandle>) -> Self {
        Self::Handles(handles)
    }
}

/// Canonical form of a factory input: the object plus whatever extra
/// handles came with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleSet {
    object: Option<ObjectHandle>,
    plug: Option<Plug>,
    dag_path: Option<DagPath>,
}

impl HandleSet {
    pub fn normalize<S: SceneGraph>(scene: &S, input: FactoryInput) -> FactoryResult<Self> {
        match input {
            FactoryInput::Name(name) => match scene.resolve_name(&name)? {
                NameTarget::Node(node) => Self::normalize(scene, node.into()),
                NameTarget::Plug(plug) => Ok(Self::from_plug(plug)),
                NameTarget::Component(path, component) => Ok(Self::from_component(path, component)),
            },
            FactoryInput::Component(path, component) => {
                if path.leaf() != Some(component.node) {
                    return Err(FactoryError::InvalidInput(format!(
                        "{component:?} does not live on the leaf of {path:?}"
                    )));
                }
                Ok(Self::from_component(path, component))
            }
            FactoryInput::Handles(handles) => Self::from_raw(scene, handles),
        }
    }

    fn from_plug(plug: Plug) -> Self {
        Self {
            object: Some(ObjectHandle::Attribute(plug)),
            plug: Some(plug),
            dag_path: None,
        }
    }

    fn from_component(path: DagPath, component: ComponentId) -> Self {
        Self {
            object: Some(ObjectHandle::Component(component)),
            plug: None,
            dag_path: Some(path),
        }
    }

    fn from_raw<S: SceneGraph>(scene: &S, handles: Vec<RawHandle>) -> FactoryResult<Self> {
        if handles.is_empty() {
            return Err(FactoryError::InvalidInput("no handles".into()));
        }
        let mut set = Self::default();
        for handle in handles {
            let duplicate = match handle {
                RawHandle::Object(object) => set.object.replace(object).is_some(),
                RawHandle::Plug(plug) => set.plug.replace(plug).is_some(),
                RawHandle::DagPath(path) => set.dag_path.replace(path).is_some(),
            };
            if duplicate {
                return Err(FactoryError::InvalidInput(
                    "more than one handle of the same kind".into(),
                ));
            }
        }
        if set.object.is_none() {
            set.object = match (set.plug, &set.dag_path) {
                (Some(plug), _) => Some(ObjectHandle::Attribute(plug)),
                (None, Some(path)) => path.leaf().map(ObjectHandle::Node),
                (None, None) => None,
            };
        }
        match set.object {
            Some(ObjectHandle::Node(node)) if set.dag_path.is_none() => {
                // Only dag nodes have a path.
                set.dag_path = scene.dag_path(node).ok();
            }
            None => return Err(FactoryError::InvalidInput("empty dag path".into())),
            _ => {}
        }
        Ok(set)
    }

    pub fn object(&self) -> Option<&ObjectHandle> {
        self.object.as_ref()
    }

    pub fn plug(&self) -> Option<Plug> {
        self.plug
    }

    pub fn dag_path(&self) -> Option<&DagPath> {
        self.dag_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use plugwork_scene::{ComponentKind, MemoryScene};

    use super::*;

    #[test]
    fn names_normalize_to_handles() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("transform", Some("hip"), None).unwrap();

        let set = HandleSet::normalize(&scene, "hip".into()).unwrap();
        assert_eq!(set.object(), Some(&ObjectHandle::Node(node)));
        assert_eq!(set.dag_path(), Some(&DagPath::new(vec![node])));

        let set = HandleSet::normalize(&scene, "hip.tx".into()).unwrap();
        assert!(matches!(set.object(), Some(ObjectHandle::Attribute(_))));
        assert!(set.plug().is_some());
    }

    #[test]
    fn dag_path_alone_names_its_leaf() {
        let mut scene = MemoryScene::new();
        let root = scene.create_node("transform", None, None).unwrap();
        let leaf = scene.create_node("mesh", None, Some(root)).unwrap();
        let path = scene.dag_path(leaf).unwrap();
        let set = HandleSet::normalize(&scene, path.into()).unwrap();
        assert_eq!(set.object(), Some(&ObjectHandle::Node(leaf)));
    }

    #[test]
    fn malformed_inputs() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("mesh", None, None).unwrap();
        let other = scene.create_node("mesh", None, None).unwrap();
        assert!(matches!(
            HandleSet::normalize(&scene, FactoryInput::Handles(Vec::new())),
            Err(FactoryError::InvalidInput(_))
        ));
        assert!(matches!(
            HandleSet::normalize(
                &scene,
                FactoryInput::Handles(vec![
                    RawHandle::Object(ObjectHandle::Node(node)),
                    RawHandle::Object(ObjectHandle::Node(other)),
                ])
            ),
            Err(FactoryError::InvalidInput(_))
        ));
        let component = ComponentId {
            node: other,
            kind: ComponentKind::Vertex,
            index: 0,
        };
        let path = scene.dag_path(node).unwrap();
        assert!(matches!(
            HandleSet::normalize(&scene, (path, component).into()),
            Err(FactoryError::InvalidInput(_))
        ));
    }
}
