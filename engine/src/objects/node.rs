use std::hash::{Hash, Hasher};

use plugwork_core::{OperationError, ProxyOperation};
use plugwork_scene::{DagPath, NodeId, SceneGraph};

use super::{Attribute, SceneObject};
use crate::attribute::AttributeDescriptor;
use crate::context::SceneContext;
use crate::error::{EngineError, EngineResult};
use crate::factory::ObjectKind;
use crate::modifier::Modifier;

/// Undoable node lock toggle.
pub type NodeLockOp<S> = ProxyOperation<S, bool>;

/// A dependency node, possibly with dag or transform capabilities.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    id: NodeId,
    kind: ObjectKind,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: ObjectKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_dag(&self) -> bool {
        self.kind.is_dag()
    }

    pub fn name<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<String> {
        Ok(ctx.scene().node_name(self.id)?)
    }

    pub fn node_type<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<String> {
        Ok(ctx.scene().node_type(self.id)?)
    }

    /// Whether an attribute answers to `name`, long or short.
    pub fn has_attr<S: SceneGraph>(&self, ctx: &SceneContext<S>, name: &str) -> EngineResult<bool> {
        Ok(ctx.scene().find_attribute(self.id, name)?.is_some())
    }

    pub fn attr<S: SceneGraph>(&self, ctx: &SceneContext<S>, name: &str) -> EngineResult<Attribute> {
        match ctx.scene().find_attribute(self.id, name)? {
            Some(plug) => ctx.wrap_attribute(plug),
            None => Err(EngineError::AttributeNotFound {
                node: self.name(ctx)?,
                name: name.to_owned(),
            }),
        }
    }

    /// Top-level attributes in creation order.
    pub fn attrs<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<Attribute>> {
        ctx.scene()
            .attributes(self.id)?
            .into_iter()
            .map(|plug| ctx.wrap_attribute(plug))
            .collect()
    }

    pub fn rename_with(&self, modifier: &mut Modifier, name: &str) -> EngineResult {
        modifier.rename_node(self.id, name)?;
        Ok(())
    }

    /// Renames through an undoable modifier and returns the applied name.
    pub fn rename<S: SceneGraph>(&self, ctx: &mut SceneContext<S>, name: &str) -> EngineResult<String> {
        let mut modifier = ctx.modifier(format!("rename {} to {name}", self.name(ctx)?));
        self.rename_with(&mut modifier, name)?;
        ctx.commit(modifier)?;
        self.name(ctx)
    }

    /// Validates, builds and stages an attribute on `modifier`.
    ///
    /// The caller commits the modifier and then purges the node's staging
    /// buffer.
    pub fn add_attr_with<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        desc: &AttributeDescriptor,
        modifier: &mut Modifier,
    ) -> EngineResult {
        ctx.add_attribute_with(self.id, desc, modifier)
    }

    pub fn add_attr<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        desc: &AttributeDescriptor,
    ) -> EngineResult {
        ctx.add_attribute(self.id, desc)
    }

    pub fn is_locked<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<bool> {
        Ok(ctx.scene().is_node_locked(self.id)?)
    }

    pub fn set_locked_direct<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        locked: bool,
    ) -> EngineResult {
        ctx.scene_mut().set_node_locked(self.id, locked)?;
        Ok(())
    }

    /// Applies the lock state and returns the operation that reverts it.
    pub fn set_locked_op<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        locked: bool,
    ) -> EngineResult<NodeLockOp<S>> {
        let node = self.id;
        let op = ProxyOperation::capture(
            ctx.scene_mut(),
            format!("lock {node}"),
            |scene: &S| scene.is_node_locked(node).map_err(OperationError::target),
            move |scene: &mut S, locked: &bool| {
                scene
                    .set_node_locked(node, *locked)
                    .map(drop)
                    .map_err(OperationError::target)
            },
            locked,
        )?;
        Ok(op)
    }

    /// Like [`set_locked_op`](Self::set_locked_op), recorded on the ledger.
    pub fn set_locked<S: SceneGraph>(&self, ctx: &mut SceneContext<S>, locked: bool) -> EngineResult {
        let op = self.set_locked_op(ctx, locked)?;
        ctx.record(Box::new(op));
        Ok(())
    }

    pub fn parent<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Option<Node>> {
        self.require_dag("parent")?;
        ctx.scene()
            .parent(self.id)?
            .map(|parent| ctx.wrap_node(parent))
            .transpose()
    }

    pub fn children<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<Node>> {
        self.require_dag("children")?;
        ctx.scene()
            .children(self.id)?
            .into_iter()
            .map(|child| ctx.wrap_node(child))
            .collect()
    }

    pub fn dag_path<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<DagPath> {
        self.require_dag("dag path")?;
        Ok(ctx.scene().dag_path(self.id)?)
    }

    // Object sets

    /// Live members of this object set.
    pub fn members<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<SceneObject>> {
        self.require_set("members")?;
        ctx.scene()
            .set_members(self.id)?
            .into_iter()
            .map(|handle| ctx.wrap_handle(handle))
            .collect()
    }

    pub fn is_member<S: SceneGraph>(
        &self,
        ctx: &SceneContext<S>,
        member: &SceneObject,
    ) -> EngineResult<bool> {
        self.require_set("is_member")?;
        Ok(ctx.scene().is_set_member(self.id, &member.handle())?)
    }

    pub fn add_member_with(&self, modifier: &mut Modifier, member: &SceneObject) -> EngineResult {
        self.require_set("add_member")?;
        modifier.add_set_member(self.id, member.handle())?;
        Ok(())
    }

    pub fn add_member<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        member: &SceneObject,
    ) -> EngineResult {
        self.add_members(ctx, std::slice::from_ref(member))
    }

    /// Adds every member in one undoable step.
    pub fn add_members<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        members: &[SceneObject],
    ) -> EngineResult {
        let mut modifier = ctx.modifier(format!("add members to {}", self.name(ctx)?));
        for member in members {
            self.add_member_with(&mut modifier, member)?;
        }
        ctx.commit(modifier)
    }

    pub fn remove_member_with(&self, modifier: &mut Modifier, member: &SceneObject) -> EngineResult {
        self.require_set("remove_member")?;
        modifier.remove_set_member(self.id, member.handle())?;
        Ok(())
    }

    pub fn remove_member<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        member: &SceneObject,
    ) -> EngineResult {
        self.remove_members(ctx, std::slice::from_ref(member))
    }

    pub fn remove_members<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        members: &[SceneObject],
    ) -> EngineResult {
        let mut modifier = ctx.modifier(format!("remove members from {}", self.name(ctx)?));
        for member in members {
            self.remove_member_with(&mut modifier, member)?;
        }
        ctx.commit(modifier)
    }

    /// Stages the removal of every current member.
    pub fn clear_with<S: SceneGraph>(
        &self,
        ctx: &SceneContext<S>,
        modifier: &mut Modifier,
    ) -> EngineResult {
        self.require_set("clear")?;
        for member in ctx.scene().set_members(self.id)? {
            modifier.remove_set_member(self.id, member)?;
        }
        Ok(())
    }

    pub fn clear<S: SceneGraph>(&self, ctx: &mut SceneContext<S>) -> EngineResult {
        let mut modifier = ctx.modifier(format!("clear {}", self.name(ctx)?));
        self.clear_with(ctx, &mut modifier)?;
        ctx.commit(modifier)
    }

    fn require_set(&self, what: &'static str) -> EngineResult {
        if self.kind == ObjectKind::ObjectSet {
            Ok(())
        } else {
            Err(EngineError::Unsupported {
                what,
                kind: self.kind,
            })
        }
    }

    fn require_dag(&self, what: &'static str) -> EngineResult {
        if self.is_dag() {
            Ok(())
        } else {
            Err(EngineError::Unsupported {
                what,
                kind: self.kind,
            })
        }
    }
}
