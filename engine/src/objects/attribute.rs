use std::hash::{Hash, Hasher};

use plugwork_core::{OperationError, ProxyOperation};
use plugwork_scene::{AttributeInfo, Plug, PlugFlag, PlugValue, SceneGraph, SceneResult};

use super::Node;
use crate::context::SceneContext;
use crate::error::{EngineError, EngineResult};
use crate::factory::ObjectKind;
use crate::modifier::Modifier;

/// Undoable change of one or more plug flags.
pub type PlugFlagOp<S> = ProxyOperation<S, Vec<(PlugFlag, bool)>>;

/// An attribute on a specific node.
#[derive(Debug, Clone, Copy)]
pub struct Attribute {
    plug: Plug,
    kind: ObjectKind,
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.plug == other.plug
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.plug.hash(state);
    }
}

impl Attribute {
    pub(crate) fn new(plug: Plug, kind: ObjectKind) -> Self {
        Self { plug, kind }
    }

    pub fn plug(&self) -> Plug {
        self.plug
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// Logical index when this wraps one element of an array.
    pub fn index(&self) -> Option<u32> {
        self.plug.index
    }

    pub fn node<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Node> {
        ctx.wrap_node(self.plug.node)
    }

    /// `node.attribute` form.
    pub fn name<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<String> {
        Ok(ctx.scene().plug_name(self.plug)?)
    }

    pub fn info<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<AttributeInfo> {
        Ok(ctx.scene().attribute_info(self.plug)?)
    }

    pub fn is_multi<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<bool> {
        Ok(self.info(ctx)?.is_array)
    }

    /// The element at logical `index` of this array attribute.
    pub fn element<S: SceneGraph>(&self, ctx: &SceneContext<S>, index: u32) -> EngineResult<Attribute> {
        if !self.is_multi(ctx)? {
            return Err(EngineError::Unsupported {
                what: "element access",
                kind: self.kind,
            });
        }
        ctx.wrap_attribute(self.plug.array().element(index))
    }

    /// Indices of the elements that were written or connected.
    pub fn multi_indices<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<u32>> {
        Ok(ctx.scene().element_indices(self.plug)?)
    }

    pub fn elements<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<Attribute>> {
        self.multi_indices(ctx)?
            .into_iter()
            .map(|index| ctx.wrap_attribute(self.plug.array().element(index)))
            .collect()
    }

    /// Stages a rename of the long name, or of the short name with `short`.
    pub fn rename_with(&self, modifier: &mut Modifier, name: &str, short: bool) -> EngineResult {
        modifier.rename_attribute(self.plug, name, short)?;
        Ok(())
    }

    pub fn rename<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        name: &str,
        short: bool,
    ) -> EngineResult {
        let mut modifier = ctx.modifier(format!("rename {} to {name}", self.name(ctx)?));
        self.rename_with(&mut modifier, name, short)?;
        ctx.commit(modifier)
    }

    pub fn value<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<PlugValue> {
        Ok(ctx.scene().plug_value(self.plug)?)
    }

    /// Stages a value. A string selects an enum field by name.
    pub fn set_with(&self, modifier: &mut Modifier, value: impl Into<PlugValue>) -> EngineResult {
        modifier.set_plug_value(self.plug, value)?;
        Ok(())
    }

    pub fn set<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        value: impl Into<PlugValue>,
    ) -> EngineResult {
        let mut modifier = ctx.modifier(format!("set {}", self.name(ctx)?));
        self.set_with(&mut modifier, value)?;
        ctx.commit(modifier)
    }

    /// Stages a connection from this attribute to `destination`. With
    /// `force`, whatever drives the destination is disconnected first.
    pub fn connect_with(
        &self,
        modifier: &mut Modifier,
        destination: &Attribute,
        force: bool,
    ) -> EngineResult {
        if force {
            modifier.connect_forced(self.plug, destination.plug)?;
        } else {
            modifier.connect(self.plug, destination.plug)?;
        }
        Ok(())
    }

    pub fn connect<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        destination: &Attribute,
        force: bool,
    ) -> EngineResult {
        let description = format!("connect {} to {}", self.name(ctx)?, destination.name(ctx)?);
        let mut modifier = ctx.modifier(description);
        self.connect_with(&mut modifier, destination, force)?;
        ctx.commit(modifier)
    }

    /// Stages a connection to the first element of the `destination` array
    /// that nothing drives when the modifier commits.
    pub fn connect_next_available_with(
        &self,
        modifier: &mut Modifier,
        destination: &Attribute,
    ) -> EngineResult {
        modifier.connect_next_available(self.plug, destination.plug)?;
        Ok(())
    }

    /// Connects to the first free element of `destination` and returns that
    /// element.
    pub fn connect_next_available<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        destination: &Attribute,
    ) -> EngineResult<Attribute> {
        let description = format!("connect {} to {}", self.name(ctx)?, destination.name(ctx)?);
        let mut modifier = ctx.modifier(description);
        self.connect_next_available_with(&mut modifier, destination)?;
        ctx.commit(modifier)?;
        let element = ctx
            .scene()
            .destinations(self.plug)?
            .into_iter()
            .rev()
            .find(|plug| plug.same_attribute(&destination.plug))
            .ok_or_else(|| EngineError::AttributeNotFound {
                node: destination.plug.node.to_string(),
                name: "next available element".to_owned(),
            })?;
        ctx.wrap_attribute(element)
    }

    pub fn disconnect_with(&self, modifier: &mut Modifier, destination: &Attribute) -> EngineResult {
        modifier.disconnect(self.plug, destination.plug)?;
        Ok(())
    }

    pub fn disconnect<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        destination: &Attribute,
    ) -> EngineResult {
        let description = format!("disconnect {} from {}", self.name(ctx)?, destination.name(ctx)?);
        let mut modifier = ctx.modifier(description);
        self.disconnect_with(&mut modifier, destination)?;
        ctx.commit(modifier)
    }

    /// The incoming connection; `None` when nothing drives this attribute.
    pub fn source<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Option<Attribute>> {
        ctx.scene()
            .source(self.plug)?
            .map(|plug| ctx.wrap_attribute(plug))
            .transpose()
    }

    pub fn destinations<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<Attribute>> {
        ctx.scene()
            .destinations(self.plug)?
            .into_iter()
            .map(|plug| ctx.wrap_attribute(plug))
            .collect()
    }

    pub fn children<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<Vec<Attribute>> {
        ctx.scene()
            .plug_children(self.plug)?
            .into_iter()
            .map(|plug| ctx.wrap_attribute(plug))
            .collect()
    }

    pub fn is_keyable<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<bool> {
        Ok(ctx.scene().plug_flag(self.plug, PlugFlag::Keyable)?)
    }

    pub fn is_locked<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<bool> {
        Ok(ctx.scene().plug_flag(self.plug, PlugFlag::Locked)?)
    }

    /// Shown in the channel box without being keyable.
    pub fn is_displayable<S: SceneGraph>(&self, ctx: &SceneContext<S>) -> EngineResult<bool> {
        Ok(ctx.scene().plug_flag(self.plug, PlugFlag::ChannelBox)?)
    }

    /// A keyable attribute leaves the non-keyable channel box list.
    pub fn set_keyable_direct<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        keyable: bool,
    ) -> EngineResult {
        let scene = ctx.scene_mut();
        scene.set_plug_flag(self.plug, PlugFlag::Keyable, keyable)?;
        scene.set_plug_flag(self.plug, PlugFlag::ChannelBox, !keyable)?;
        Ok(())
    }

    pub fn set_locked_direct<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        locked: bool,
    ) -> EngineResult {
        ctx.scene_mut().set_plug_flag(self.plug, PlugFlag::Locked, locked)?;
        Ok(())
    }

    pub fn set_displayable_direct<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        displayable: bool,
    ) -> EngineResult {
        ctx.scene_mut()
            .set_plug_flag(self.plug, PlugFlag::ChannelBox, displayable)?;
        Ok(())
    }

    pub fn set_keyable_op<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        keyable: bool,
    ) -> EngineResult<PlugFlagOp<S>> {
        self.flag_op(
            ctx,
            "keyable",
            vec![(PlugFlag::Keyable, keyable), (PlugFlag::ChannelBox, !keyable)],
        )
    }

    pub fn set_locked_op<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        locked: bool,
    ) -> EngineResult<PlugFlagOp<S>> {
        self.flag_op(ctx, "locked", vec![(PlugFlag::Locked, locked)])
    }

    pub fn set_displayable_op<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        displayable: bool,
    ) -> EngineResult<PlugFlagOp<S>> {
        self.flag_op(ctx, "displayable", vec![(PlugFlag::ChannelBox, displayable)])
    }

    pub fn set_keyable<S: SceneGraph>(&self, ctx: &mut SceneContext<S>, keyable: bool) -> EngineResult {
        let op = self.set_keyable_op(ctx, keyable)?;
        ctx.record(Box::new(op));
        Ok(())
    }

    pub fn set_locked<S: SceneGraph>(&self, ctx: &mut SceneContext<S>, locked: bool) -> EngineResult {
        let op = self.set_locked_op(ctx, locked)?;
        ctx.record(Box::new(op));
        Ok(())
    }

    pub fn set_displayable<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        displayable: bool,
    ) -> EngineResult {
        let op = self.set_displayable_op(ctx, displayable)?;
        ctx.record(Box::new(op));
        Ok(())
    }

    /// Captures the current state of the flags in `changes`, applies
    /// `changes`, and returns the operation holding both.
    fn flag_op<S: SceneGraph>(
        &self,
        ctx: &mut SceneContext<S>,
        what: &str,
        changes: Vec<(PlugFlag, bool)>,
    ) -> EngineResult<PlugFlagOp<S>> {
        let plug = self.plug;
        let description = format!("set {what} on {}", self.name(ctx)?);
        let flags: Vec<PlugFlag> = changes.iter().map(|(flag, _)| *flag).collect();
        let op = ProxyOperation::capture(
            ctx.scene_mut(),
            description,
            move |scene: &S| {
                flags
                    .iter()
                    .map(|flag| Ok((*flag, scene.plug_flag(plug, *flag)?)))
                    .collect::<SceneResult<Vec<_>>>()
                    .map_err(OperationError::target)
            },
            move |scene: &mut S, values: &Vec<(PlugFlag, bool)>| {
                for (flag, value) in values {
                    scene
                        .set_plug_flag(plug, *flag, *value)
                        .map_err(OperationError::target)?;
                }
                Ok(())
            },
            changes,
        )?;
        Ok(op)
    }
}
