//! Lazy wrapping of selection lists.

use plugwork_scene::SceneGraph;

use super::registry::ObjectRegistry;
use super::{FactoryInput, FactoryResult};
use crate::objects::SceneObject;

/// Single-pass iterator over wrapped selection items.
///
/// Each item is resolved when the iterator reaches it; a failing item yields
/// an error and iteration continues with the next one.
pub struct FromSelection<'a, S, I> {
    registry: &'a ObjectRegistry,
    scene: &'a S,
    items: I,
}

impl<'a, S, I> FromSelection<'a, S, I> {
    pub(super) fn new(registry: &'a ObjectRegistry, scene: &'a S, items: I) -> Self {
        Self {
            registry,
            scene,
            items,
        }
    }
}

impl<S, I> Iterator for FromSelection<'_, S, I>
where
    S: SceneGraph,
    I: Iterator,
    I::Item: Into<FactoryInput>,
{
    type Item = FactoryResult<SceneObject>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items.next()?;
        Some(self.registry.create(self.scene, item))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use plugwork_scene::{ComponentId, ComponentKind, MemoryScene, SceneGraph};

    use super::*;
    use crate::factory::{FactoryError, ObjectKind};

    #[test]
    fn mixed_selection_in_order() {
        let mut scene = MemoryScene::new();
        let root = scene.create_node("transform", Some("root"), None).unwrap();
        let mesh = scene.create_node("mesh", Some("shape"), Some(root)).unwrap();
        let path = scene.dag_path(mesh).unwrap();
        let plug = scene.find_attribute(root, "tx").unwrap().unwrap();
        let component = ComponentId {
            node: mesh,
            kind: ComponentKind::Face,
            index: 2,
        };

        let registry = ObjectRegistry::with_defaults();
        let items: Vec<FactoryInput> = vec![
            root.into(),
            path.clone().into(),
            (path, component).into(),
            plug.into(),
            "missing".into(),
        ];
        let kinds: Vec<_> = registry
            .from_selection(&scene, items)
            .map(|object| object.map(|o| o.kind()))
            .collect();
        assert!(matches!(
            kinds.as_slice(),
            [
                Ok(ObjectKind::Transform),
                Ok(ObjectKind::DagNode),
                Ok(ObjectKind::Component),
                Ok(ObjectKind::NumericAttribute),
                Err(FactoryError::Scene(_)),
            ]
        ));
    }

    #[test]
    fn iteration_is_lazy() {
        let mut scene = MemoryScene::new();
        scene.create_node("network", Some("a"), None).unwrap();
        let registry = ObjectRegistry::with_defaults();
        let mut resolved = 0;
        let mut selection = registry.from_selection(
            &scene,
            ["a", "a", "a"].into_iter().inspect(|_| resolved += 1),
        );
        selection.next().unwrap().unwrap();
        drop(selection);
        assert_eq!(resolved, 1);
    }
}
