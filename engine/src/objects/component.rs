use plugwork_scene::{ComponentId, ComponentKind, DagPath, NodeId, SceneGraph};

use crate::context::SceneContext;
use crate::error::EngineResult;

/// A vertex, edge or face of a shape, with the dag path it was reached by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    path: DagPath,
    component: ComponentId,
}

impl Component {
    pub(crate) fn new(path: DagPath, component: ComponentId) -> Self {
        Self { path, component }
    }

    pub fn path(&self) -> &DagPath {
        &self.path
    }

    pub fn id(&self) -> &ComponentId {
        &self.component
    }

    pub fn node(&self) -> NodeId {
        self.component.node
    }

    pub fn component_kind(&self) -> ComponentKind {
        self.component.kind
    }

    pub fn index(&self) -> u32 {
        self.component.index
    }

    /// `shape.vtx[3]` form.
    pub fn name<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<String> {
        Ok(format!(
            "{}.{}[{}]",
            ctx.scene().node_name(self.component.node)?,
            self.component.kind.token(),
            self.component.index
        ))
    }
}
