//! Batched, reversible scene mutations.
//!
//! A [`Modifier`] collects mutation requests during a *stage* phase and runs
//! them in insertion order on [`commit`](Modifier::commit). Every applied
//! request leaves an inverse record behind, so [`rollback`](Modifier::rollback)
//! can take the whole batch back in reverse order. Committing again after a
//! rollback replays the batch; nodes and attributes created by the batch come
//! back under the same handles, so later history entries still reach them.

use plugwork_core::{Operation, OperationError, OperationResult};
use plugwork_scene::{
    AttributeObject, DataType, NodeId, ObjectHandle, Plug, PlugValue, SceneError, SceneGraph,
};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A node that exists already or will be created by the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Existing(NodeId),
    /// Created by the queued operation at this index.
    Pending(usize),
}

impl From<NodeId> for NodeRef {
    fn from(node: NodeId) -> Self {
        Self::Existing(node)
    }
}

/// A plug handle, or an attribute name on a possibly pending node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlugRef {
    Existing(Plug),
    Named { node: NodeRef, attribute: String },
}

impl PlugRef {
    pub fn named(node: impl Into<NodeRef>, attribute: impl Into<String>) -> Self {
        Self::Named {
            node: node.into(),
            attribute: attribute.into(),
        }
    }
}

impl From<Plug> for PlugRef {
    fn from(plug: Plug) -> Self {
        Self::Existing(plug)
    }
}

/// One queued mutation request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierOp {
    CreateNode {
        node_type: String,
        name: Option<String>,
        parent: Option<NodeRef>,
    },
    RenameNode {
        node: NodeRef,
        name: String,
    },
    /// With `force`, an existing incoming connection of the destination is
    /// replaced.
    Connect {
        source: PlugRef,
        destination: PlugRef,
        force: bool,
    },
    /// Connects to the lowest element of the destination array that has no
    /// incoming connection when the batch runs.
    ConnectNextAvailable {
        source: PlugRef,
        destination: PlugRef,
    },
    Disconnect {
        source: PlugRef,
        destination: PlugRef,
    },
    /// A string value on an enum plug selects the field by name.
    SetPlugValue {
        plug: PlugRef,
        value: PlugValue,
    },
    AddAttribute {
        node: NodeRef,
        attribute: AttributeObject,
        parent: Option<String>,
    },
    /// With `short`, the short name changes instead of the long one.
    RenameAttribute {
        plug: PlugRef,
        name: String,
        short: bool,
    },
    AddSetMember {
        set: NodeRef,
        member: ObjectHandle,
    },
    RemoveSetMember {
        set: NodeRef,
        member: ObjectHandle,
    },
}

impl ModifierOp {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateNode { .. } => "create node",
            Self::RenameNode { .. } => "rename node",
            Self::Connect { .. } => "connect",
            Self::ConnectNextAvailable { .. } => "connect next available",
            Self::Disconnect { .. } => "disconnect",
            Self::SetPlugValue { .. } => "set plug value",
            Self::AddAttribute { .. } => "add attribute",
            Self::RenameAttribute { .. } => "rename attribute",
            Self::AddSetMember { .. } => "add set member",
            Self::RemoveSetMember { .. } => "remove set member",
        }
    }

    fn node_refs(&self) -> Vec<NodeRef> {
        let plug_node = |plug: &PlugRef| match plug {
            PlugRef::Existing(_) => None,
            PlugRef::Named { node, .. } => Some(*node),
        };
        match self {
            Self::CreateNode { parent, .. } => parent.iter().copied().collect(),
            Self::RenameNode { node, .. } | Self::AddAttribute { node, .. } => vec![*node],
            Self::AddSetMember { set, .. } | Self::RemoveSetMember { set, .. } => vec![*set],
            Self::Connect {
                source,
                destination,
                ..
            }
            | Self::ConnectNextAvailable {
                source,
                destination,
            }
            | Self::Disconnect {
                source,
                destination,
            } => plug_node(source).into_iter().chain(plug_node(destination)).collect(),
            Self::SetPlugValue { plug, .. } | Self::RenameAttribute { plug, .. } => {
                plug_node(plug).into_iter().collect()
            }
        }
    }
}

/// Lifecycle of a [`Modifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifierState {
    /// Accepting operations.
    #[default]
    Pending,
    Committed,
    /// Undone; committing again replays the batch.
    RolledBack,
}

/// What [`Modifier::commit`] does when one operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Keep going and report every failure.
    #[default]
    BestEffort,
    /// Take back what was applied and stop at the first failure.
    Atomic,
}

/// Error type for modifier staging, commit and rollback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModifierError {
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// The node that queue slot should have created does not exist.
    #[error("operation {0} did not produce a node")]
    UnresolvedReference(usize),
    #[error("{} of {} operations failed", .failed.len(), .total)]
    PartialCommit {
        total: usize,
        applied: Vec<usize>,
        failed: Vec<(usize, ModifierError)>,
    },
    /// An atomic commit failed and everything it applied was undone.
    #[error("operation {index} failed, batch rolled back: {cause}")]
    Aborted {
        index: usize,
        cause: Box<ModifierError>,
    },
    #[error("{} inverse operation(s) failed during rollback", .failed.len())]
    PartialRollback { failed: Vec<(usize, ModifierError)> },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

pub type ModifierResult<T = ()> = Result<T, ModifierError>;

/// How to take back one applied operation.
#[derive(Debug, Clone)]
enum Inverse {
    Created(NodeId),
    Renamed {
        node: NodeId,
        old: String,
    },
    Connected {
        source: Plug,
        destination: Plug,
        replaced: Option<Plug>,
    },
    Disconnected {
        source: Plug,
        destination: Plug,
    },
    ValueSet {
        plug: Plug,
        old: PlugValue,
    },
    AttributeAdded(Plug),
    AttributeRenamed {
        plug: Plug,
        old: String,
        short: bool,
    },
    MemberAdded {
        set: NodeId,
        member: ObjectHandle,
    },
    MemberRemoved {
        set: NodeId,
        member: ObjectHandle,
    },
    /// The request was already satisfied; nothing to take back.
    Unchanged,
}

/// Accumulates mutation requests and applies them as one reversible unit.
///
/// A modifier never records itself anywhere; hand it to an
/// [`UndoLedger`](plugwork_core::UndoLedger) after a successful commit, or
/// put it in a [`CompoundOperation`](plugwork_core::CompoundOperation).
///
/// ```ignore
/// let mut modifier = Modifier::new("rig");
/// let root = modifier.create_node("transform", Some("root"), None)?;
/// modifier.set_plug_value(PlugRef::named(root, "tx"), 2.0)?;
/// modifier.commit(&mut scene)?;
/// ledger.record(Box::new(modifier));
/// ```
#[derive(Debug)]
pub struct Modifier {
    description: String,
    policy: CommitPolicy,
    state: ModifierState,
    ops: Vec<ModifierOp>,
    /// Node made by each queue slot; survives rollback for id-preserving redo.
    created: Vec<Option<NodeId>>,
    /// Attribute attached by each queue slot, kept the same way.
    attached: Vec<Option<Plug>>,
    applied: Vec<(usize, Inverse)>,
}

impl Modifier {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            policy: CommitPolicy::default(),
            state: ModifierState::Pending,
            ops: Vec::new(),
            created: Vec::new(),
            attached: Vec::new(),
            applied: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn policy(&self) -> CommitPolicy {
        self.policy
    }

    pub fn state(&self) -> ModifierState {
        self.state
    }

    pub fn ops(&self) -> &[ModifierOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Queue indices applied by the last commit.
    pub fn applied(&self) -> Vec<usize> {
        self.applied.iter().map(|(index, _)| *index).collect()
    }

    /// Names of attributes queued for `node` and not yet committed.
    pub fn staged_attribute_names(&self, node: NodeId) -> Vec<&str> {
        if self.state == ModifierState::Committed {
            return Vec::new();
        }
        self.ops
            .iter()
            .filter_map(|op| match op {
                ModifierOp::AddAttribute {
                    node: NodeRef::Existing(target),
                    attribute,
                    ..
                } if *target == node => Some(attribute.all_names()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Long names of the attributes the last commit attached, by node.
    pub fn attached_attributes(&self) -> BTreeMap<NodeId, Vec<String>> {
        let mut attached: BTreeMap<NodeId, Vec<String>> = BTreeMap::new();
        for (index, _) in &self.applied {
            if let ModifierOp::AddAttribute {
                node: NodeRef::Existing(node),
                attribute,
                ..
            } = &self.ops[*index]
            {
                attached
                    .entry(*node)
                    .or_default()
                    .push(attribute.long_name().to_string());
            }
        }
        attached
    }

    /// Queues an operation and returns its queue index.
    ///
    /// For [`ModifierOp::CreateNode`] the index is the provisional handle:
    /// `NodeRef::Pending(index)`.
    pub fn stage(&mut self, op: ModifierOp) -> ModifierResult<usize> {
        if self.state != ModifierState::Pending {
            return Err(ModifierError::InvalidOperation(format!(
                "'{}' is {:?}; reset it before staging",
                self.description, self.state
            )));
        }
        for node in op.node_refs() {
            if let NodeRef::Pending(index) = node
                && !matches!(self.ops.get(index), Some(ModifierOp::CreateNode { .. }))
            {
                return Err(ModifierError::InvalidOperation(format!(
                    "{} refers to queue slot {index}, which creates no node",
                    op.kind()
                )));
            }
        }
        log::debug!("Staged {} on '{}'", op.kind(), self.description);
        self.ops.push(op);
        self.created.push(None);
        self.attached.push(None);
        Ok(self.ops.len() - 1)
    }

    pub fn create_node(
        &mut self,
        node_type: impl Into<String>,
        name: Option<&str>,
        parent: Option<NodeRef>,
    ) -> ModifierResult<NodeRef> {
        let index = self.stage(ModifierOp::CreateNode {
            node_type: node_type.into(),
            name: name.map(str::to_owned),
            parent,
        })?;
        Ok(NodeRef::Pending(index))
    }

    pub fn rename_node(
        &mut self,
        node: impl Into<NodeRef>,
        name: impl Into<String>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::RenameNode {
            node: node.into(),
            name: name.into(),
        })
    }

    pub fn connect(
        &mut self,
        source: impl Into<PlugRef>,
        destination: impl Into<PlugRef>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::Connect {
            source: source.into(),
            destination: destination.into(),
            force: false,
        })
    }

    /// Connects, replacing whatever drives the destination.
    pub fn connect_forced(
        &mut self,
        source: impl Into<PlugRef>,
        destination: impl Into<PlugRef>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::Connect {
            source: source.into(),
            destination: destination.into(),
            force: true,
        })
    }

    /// Connects to the first free element of the `destination` array.
    pub fn connect_next_available(
        &mut self,
        source: impl Into<PlugRef>,
        destination: impl Into<PlugRef>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::ConnectNextAvailable {
            source: source.into(),
            destination: destination.into(),
        })
    }

    pub fn disconnect(
        &mut self,
        source: impl Into<PlugRef>,
        destination: impl Into<PlugRef>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::Disconnect {
            source: source.into(),
            destination: destination.into(),
        })
    }

    pub fn set_plug_value(
        &mut self,
        plug: impl Into<PlugRef>,
        value: impl Into<PlugValue>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::SetPlugValue {
            plug: plug.into(),
            value: value.into(),
        })
    }

    pub fn add_attribute(
        &mut self,
        node: impl Into<NodeRef>,
        attribute: AttributeObject,
        parent: Option<&str>,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::AddAttribute {
            node: node.into(),
            attribute,
            parent: parent.map(str::to_owned),
        })
    }

    pub fn rename_attribute(
        &mut self,
        plug: impl Into<PlugRef>,
        name: impl Into<String>,
        short: bool,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::RenameAttribute {
            plug: plug.into(),
            name: name.into(),
            short,
        })
    }

    pub fn add_set_member(
        &mut self,
        set: impl Into<NodeRef>,
        member: ObjectHandle,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::AddSetMember {
            set: set.into(),
            member,
        })
    }

    pub fn remove_set_member(
        &mut self,
        set: impl Into<NodeRef>,
        member: ObjectHandle,
    ) -> ModifierResult<usize> {
        self.stage(ModifierOp::RemoveSetMember {
            set: set.into(),
            member,
        })
    }

    /// The node behind a reference, once the batch has created it.
    pub fn resolve(&self, node: NodeRef) -> Option<NodeId> {
        match node {
            NodeRef::Existing(id) => Some(id),
            NodeRef::Pending(index) => self.created.get(index).copied().flatten(),
        }
    }

    /// Applies every queued operation in order.
    ///
    /// Fails with [`ModifierError::InvalidOperation`] when already committed.
    /// Under [`CommitPolicy::BestEffort`] the modifier ends up committed even
    /// when some operations fail, and the error lists them; under
    /// [`CommitPolicy::Atomic`] nothing stays applied after a failure.
    pub fn commit<S: SceneGraph>(&mut self, scene: &mut S) -> ModifierResult {
        if self.state == ModifierState::Committed {
            return Err(ModifierError::InvalidOperation(format!(
                "'{}' is already committed",
                self.description
            )));
        }
        self.applied.clear();
        let mut failed = Vec::new();
        for index in 0..self.ops.len() {
            match self.apply(scene, index) {
                Ok(inverse) => self.applied.push((index, inverse)),
                Err(err) => {
                    log::warn!(
                        "'{}': {} #{index} failed: {err}",
                        self.description,
                        self.ops[index].kind()
                    );
                    if self.policy == CommitPolicy::Atomic {
                        for (undo_index, undo_err) in self.unwind(scene) {
                            log::warn!("Could not take back operation {undo_index}: {undo_err}");
                        }
                        return Err(ModifierError::Aborted {
                            index,
                            cause: Box::new(err),
                        });
                    }
                    failed.push((index, err));
                }
            }
        }
        self.state = ModifierState::Committed;
        log::debug!(
            "Committed '{}': {} of {} operation(s) applied",
            self.description,
            self.applied.len(),
            self.ops.len()
        );
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ModifierError::PartialCommit {
                total: self.ops.len(),
                applied: self.applied(),
                failed,
            })
        }
    }

    /// Takes back every applied operation in reverse order.
    ///
    /// Does nothing unless the modifier is committed. Inverse failures do not
    /// stop the rollback; they are reported together afterwards.
    pub fn rollback<S: SceneGraph>(&mut self, scene: &mut S) -> ModifierResult {
        if self.state != ModifierState::Committed {
            log::debug!("'{}' has nothing to roll back", self.description);
            return Ok(());
        }
        let failed = self.unwind(scene);
        self.state = ModifierState::RolledBack;
        log::debug!("Rolled back '{}'", self.description);
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ModifierError::PartialRollback { failed })
        }
    }

    /// Discards the queue and all bookkeeping.
    pub fn reset(&mut self) -> ModifierResult {
        if self.state == ModifierState::Committed {
            return Err(ModifierError::InvalidOperation(format!(
                "'{}' must be rolled back before reset",
                self.description
            )));
        }
        self.ops.clear();
        self.created.clear();
        self.attached.clear();
        self.applied.clear();
        self.state = ModifierState::Pending;
        Ok(())
    }

    fn unwind<S: SceneGraph>(&mut self, scene: &mut S) -> Vec<(usize, ModifierError)> {
        let mut failed = Vec::new();
        for (index, inverse) in self.applied.drain(..).rev() {
            if let Err(err) = Self::invert(scene, &inverse) {
                log::warn!("Inverse of operation {index} failed: {err}");
                failed.push((index, err.into()));
            }
        }
        failed
    }

    fn resolve_node<S: SceneGraph>(&self, scene: &S, node: NodeRef) -> ModifierResult<NodeId> {
        match node {
            NodeRef::Existing(id) => Ok(id),
            NodeRef::Pending(index) => self
                .created
                .get(index)
                .copied()
                .flatten()
                .filter(|id| scene.is_alive(*id))
                .ok_or(ModifierError::UnresolvedReference(index)),
        }
    }

    fn resolve_plug<S: SceneGraph>(&self, scene: &S, plug: &PlugRef) -> ModifierResult<Plug> {
        match plug {
            PlugRef::Existing(plug) => Ok(*plug),
            PlugRef::Named { node, attribute } => {
                let node = self.resolve_node(scene, *node)?;
                scene.find_attribute(node, attribute)?.ok_or_else(|| {
                    let owner = scene.node_name(node).unwrap_or_else(|_| node.to_string());
                    SceneError::NotFound(format!("{owner}.{attribute}")).into()
                })
            }
        }
    }

    fn apply<S: SceneGraph>(&mut self, scene: &mut S, index: usize) -> ModifierResult<Inverse> {
        match &self.ops[index] {
            ModifierOp::CreateNode {
                node_type,
                name,
                parent,
            } => {
                if let Some(id) = self.created[index]
                    && !scene.is_alive(id)
                {
                    scene.restore_node(id)?;
                    return Ok(Inverse::Created(id));
                }
                let parent = parent
                    .map(|parent| self.resolve_node(scene, parent))
                    .transpose()?;
                let id = scene.create_node(node_type, name.as_deref(), parent)?;
                self.created[index] = Some(id);
                Ok(Inverse::Created(id))
            }
            ModifierOp::RenameNode { node, name } => {
                let node = self.resolve_node(scene, *node)?;
                let old = scene.node_name(node)?;
                scene.rename_node(node, name)?;
                Ok(Inverse::Renamed { node, old })
            }
            ModifierOp::Connect {
                source,
                destination,
                force,
            } => {
                let source = self.resolve_plug(scene, source)?;
                let destination = self.resolve_plug(scene, destination)?;
                let replaced = match scene.source(destination)? {
                    Some(previous) if *force => {
                        scene.disconnect(previous, destination)?;
                        Some(previous)
                    }
                    _ => None,
                };
                if let Err(err) = scene.connect(source, destination) {
                    if let Some(previous) = replaced
                        && let Err(restore) = scene.connect(previous, destination)
                    {
                        log::warn!("Could not reinstate replaced connection: {restore}");
                    }
                    return Err(err.into());
                }
                Ok(Inverse::Connected {
                    source,
                    destination,
                    replaced,
                })
            }
            ModifierOp::ConnectNextAvailable {
                source,
                destination,
            } => {
                let source = self.resolve_plug(scene, source)?;
                let array = self.resolve_plug(scene, destination)?.array();
                let destination = array.element(scene.next_available_index(array)?);
                scene.connect(source, destination)?;
                Ok(Inverse::Connected {
                    source,
                    destination,
                    replaced: None,
                })
            }
            ModifierOp::Disconnect {
                source,
                destination,
            } => {
                let source = self.resolve_plug(scene, source)?;
                let destination = self.resolve_plug(scene, destination)?;
                scene.disconnect(source, destination)?;
                Ok(Inverse::Disconnected {
                    source,
                    destination,
                })
            }
            ModifierOp::SetPlugValue { plug, value } => {
                let plug = self.resolve_plug(scene, plug)?;
                let value = enum_field_value(scene, plug, value)?;
                let old = scene.set_plug_value(plug, value)?;
                Ok(Inverse::ValueSet { plug, old })
            }
            ModifierOp::AddAttribute {
                node,
                attribute,
                parent,
            } => {
                if let Some(plug) = self.attached[index] {
                    scene.restore_attribute(plug)?;
                    return Ok(Inverse::AttributeAdded(plug));
                }
                let node = self.resolve_node(scene, *node)?;
                let plug = scene.add_attribute(node, attribute, parent.as_deref())?;
                self.attached[index] = Some(plug);
                Ok(Inverse::AttributeAdded(plug))
            }
            ModifierOp::RenameAttribute { plug, name, short } => {
                let plug = self.resolve_plug(scene, plug)?;
                let old = scene.rename_attribute(plug, name, *short)?;
                Ok(Inverse::AttributeRenamed {
                    plug,
                    old,
                    short: *short,
                })
            }
            ModifierOp::AddSetMember { set, member } => {
                let set = self.resolve_node(scene, *set)?;
                Ok(if scene.add_set_member(set, *member)? {
                    Inverse::MemberAdded {
                        set,
                        member: *member,
                    }
                } else {
                    Inverse::Unchanged
                })
            }
            ModifierOp::RemoveSetMember { set, member } => {
                let set = self.resolve_node(scene, *set)?;
                Ok(if scene.remove_set_member(set, *member)? {
                    Inverse::MemberRemoved {
                        set,
                        member: *member,
                    }
                } else {
                    Inverse::Unchanged
                })
            }
        }
    }

    fn invert<S: SceneGraph>(scene: &mut S, inverse: &Inverse) -> Result<(), SceneError> {
        match inverse {
            Inverse::Created(node) => scene.remove_node(*node),
            Inverse::Renamed { node, old } => scene.rename_node(*node, old).map(drop),
            Inverse::Connected {
                source,
                destination,
                replaced,
            } => {
                scene.disconnect(*source, *destination)?;
                if let Some(previous) = replaced {
                    scene.connect(*previous, *destination)?;
                }
                Ok(())
            }
            Inverse::Disconnected {
                source,
                destination,
            } => scene.connect(*source, *destination),
            Inverse::ValueSet { plug, old } => scene.set_plug_value(*plug, old.clone()).map(drop),
            Inverse::AttributeAdded(plug) => scene.remove_attribute(*plug),
            Inverse::AttributeRenamed { plug, old, short } => {
                scene.rename_attribute(*plug, old, *short).map(drop)
            }
            Inverse::MemberAdded { set, member } => scene.remove_set_member(*set, *member).map(drop),
            Inverse::MemberRemoved { set, member } => scene.add_set_member(*set, *member).map(drop),
            Inverse::Unchanged => Ok(()),
        }
    }
}

/// Maps a field name written to an enum plug onto the field's value.
fn enum_field_value<S: SceneGraph>(
    scene: &S,
    plug: Plug,
    value: &PlugValue,
) -> ModifierResult<PlugValue> {
    let PlugValue::String(name) = value else {
        return Ok(value.clone());
    };
    let info = scene.attribute_info(plug)?;
    if info.data_type != Some(DataType::Enum) {
        return Ok(value.clone());
    }
    info.enum_fields
        .iter()
        .find(|(field, _)| field == name.as_str())
        .map(|(_, index)| PlugValue::Int(*index))
        .ok_or_else(|| {
            SceneError::NotFound(format!(
                "field '{name}' of enum '{}'",
                info.long_name
            ))
            .into()
        })
}

impl<S: SceneGraph> Operation<S> for Modifier {
    fn do_it(&mut self, scene: &mut S) -> OperationResult {
        self.commit(scene).map_err(OperationError::target)
    }

    fn undo_it(&mut self, scene: &mut S) -> OperationResult {
        self.rollback(scene).map_err(OperationError::target)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugwork_scene::{AttrCategory, MemoryScene, NameTarget};

    fn plug(scene: &MemoryScene, name: &str) -> Plug {
        match scene.resolve_name(name).unwrap() {
            NameTarget::Plug(plug) => plug,
            other => panic!("{name} resolved to {other:?}"),
        }
    }

    #[test]
    fn commit_then_rollback_restores_scene() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("rig");
        let root = modifier.create_node("transform", Some("root"), None).unwrap();
        let child = modifier
            .create_node("transform", Some("child"), Some(root))
            .unwrap();
        modifier
            .set_plug_value(PlugRef::named(root, "tx"), 3.0)
            .unwrap();
        modifier
            .connect(PlugRef::named(root, "tx"), PlugRef::named(child, "ty"))
            .unwrap();

        modifier.commit(&mut scene).unwrap();
        assert_eq!(modifier.state(), ModifierState::Committed);
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.connections().len(), 1);
        assert_eq!(
            scene.plug_value(plug(&scene, "root.tx")).unwrap(),
            PlugValue::Float(3.0)
        );

        modifier.rollback(&mut scene).unwrap();
        assert_eq!(modifier.state(), ModifierState::RolledBack);
        assert_eq!(scene.node_count(), 0);
        assert!(scene.connections().is_empty());
    }

    #[test]
    fn redo_keeps_node_identity() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("create");
        let pending = modifier.create_node("network", Some("net"), None).unwrap();
        modifier.commit(&mut scene).unwrap();
        let first = modifier.resolve(pending).unwrap();

        modifier.rollback(&mut scene).unwrap();
        assert!(!scene.is_alive(first));
        modifier.commit(&mut scene).unwrap();
        assert_eq!(modifier.resolve(pending), Some(first));
        assert_eq!(scene.node_name(first).unwrap(), "net");
    }

    #[test]
    fn lifecycle_is_enforced() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("lifecycle");
        modifier.create_node("network", None, None).unwrap();
        modifier.commit(&mut scene).unwrap();

        assert!(matches!(
            modifier.create_node("network", None, None),
            Err(ModifierError::InvalidOperation(_))
        ));
        assert!(matches!(
            modifier.commit(&mut scene),
            Err(ModifierError::InvalidOperation(_))
        ));
        assert!(matches!(
            modifier.reset(),
            Err(ModifierError::InvalidOperation(_))
        ));

        modifier.rollback(&mut scene).unwrap();
        modifier.reset().unwrap();
        assert!(modifier.is_empty());
        assert_eq!(modifier.state(), ModifierState::Pending);
        modifier.create_node("network", None, None).unwrap();
    }

    #[test]
    fn rollback_without_commit_is_noop() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("idle");
        modifier.create_node("network", None, None).unwrap();
        modifier.rollback(&mut scene).unwrap();
        assert_eq!(modifier.state(), ModifierState::Pending);
    }

    #[test]
    fn forward_reference_must_point_at_creation() {
        let mut modifier = Modifier::new("refs");
        assert!(matches!(
            modifier.rename_node(NodeRef::Pending(0), "x"),
            Err(ModifierError::InvalidOperation(_))
        ));
    }

    #[test]
    fn best_effort_reports_every_failure() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("mixed");
        let bogus = modifier.create_node("teapot", None, None).unwrap();
        modifier.rename_node(bogus, "named").unwrap();
        modifier.create_node("network", Some("ok"), None).unwrap();

        let Err(ModifierError::PartialCommit {
            total,
            applied,
            failed,
        }) = modifier.commit(&mut scene)
        else {
            panic!("expected a partial commit");
        };
        assert_eq!(total, 3);
        assert_eq!(applied, vec![2]);
        assert!(matches!(
            failed[0],
            (0, ModifierError::Scene(SceneError::UnknownNodeType(_)))
        ));
        assert!(matches!(failed[1], (1, ModifierError::UnresolvedReference(0))));
        assert_eq!(modifier.state(), ModifierState::Committed);

        modifier.rollback(&mut scene).unwrap();
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn atomic_commit_takes_everything_back() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("atomic").with_policy(CommitPolicy::Atomic);
        let node = modifier.create_node("transform", Some("a"), None).unwrap();
        modifier
            .set_plug_value(PlugRef::named(node, "tx"), "not a number")
            .unwrap();

        let err = modifier.commit(&mut scene).unwrap_err();
        assert!(matches!(err, ModifierError::Aborted { index: 1, .. }));
        assert_eq!(scene.node_count(), 0);
        assert_eq!(modifier.state(), ModifierState::Pending);
    }

    #[test]
    fn forced_connect_restores_previous_source() {
        let mut scene = MemoryScene::new();
        scene.create_node("transform", Some("a"), None).unwrap();
        scene.create_node("transform", Some("b"), None).unwrap();
        let (a_tx, a_ty, b_tx) = (
            plug(&scene, "a.tx"),
            plug(&scene, "a.ty"),
            plug(&scene, "b.tx"),
        );
        scene.connect(a_tx, b_tx).unwrap();

        let mut plain = Modifier::new("plain");
        plain.connect(a_ty, b_tx).unwrap();
        assert!(plain.commit(&mut scene).is_err());

        let mut forced = Modifier::new("forced");
        forced.connect_forced(a_ty, b_tx).unwrap();
        forced.commit(&mut scene).unwrap();
        assert_eq!(scene.source(b_tx).unwrap(), Some(a_ty));

        forced.rollback(&mut scene).unwrap();
        assert_eq!(scene.source(b_tx).unwrap(), Some(a_tx));
    }

    #[test]
    fn enum_plug_accepts_field_name() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("network", Some("n"), None).unwrap();
        let mut mode = AttributeObject::create("mode", "md", AttrCategory::Enum, Some(DataType::Enum));
        mode.add_field("off", 0).unwrap();
        mode.add_field("on", 5).unwrap();

        let mut modifier = Modifier::new("enum");
        modifier.add_attribute(node, mode, None).unwrap();
        modifier
            .set_plug_value(PlugRef::named(node, "mode"), "on")
            .unwrap();
        modifier.commit(&mut scene).unwrap();
        assert_eq!(
            scene.plug_value(plug(&scene, "n.mode")).unwrap(),
            PlugValue::Int(5)
        );

        modifier.rollback(&mut scene).unwrap();
        assert_eq!(scene.find_attribute(node, "mode").unwrap(), None);
    }

    #[test]
    fn staged_names_are_visible_until_commit() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("network", None, None).unwrap();
        let mut modifier = Modifier::new("names");
        let attr = AttributeObject::create("weight", "w", AttrCategory::Numeric, Some(DataType::Float));
        modifier.add_attribute(node, attr, None).unwrap();
        assert_eq!(modifier.staged_attribute_names(node), vec!["weight", "w"]);
        modifier.commit(&mut scene).unwrap();
        assert!(modifier.staged_attribute_names(node).is_empty());
    }

    #[test]
    fn recommit_restores_attribute_under_same_plug() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("network", Some("n"), None).unwrap();
        let mut modifier = Modifier::new("weight");
        let attr = AttributeObject::create("weight", "w", AttrCategory::Numeric, Some(DataType::Float));
        modifier.add_attribute(node, attr, None).unwrap();
        modifier.commit(&mut scene).unwrap();
        let first = plug(&scene, "n.weight");

        for _ in 0..3 {
            modifier.rollback(&mut scene).unwrap();
            assert_eq!(scene.find_attribute(node, "weight").unwrap(), None);
            modifier.commit(&mut scene).unwrap();
            assert_eq!(plug(&scene, "n.weight"), first);
        }
    }

    #[test]
    fn attribute_on_pending_node_survives_replay() {
        let mut scene = MemoryScene::new();
        let mut modifier = Modifier::new("rig");
        let node = modifier.create_node("network", Some("n"), None).unwrap();
        let attr = AttributeObject::create("weight", "w", AttrCategory::Numeric, Some(DataType::Float));
        modifier.add_attribute(node, attr, None).unwrap();
        modifier.commit(&mut scene).unwrap();
        let first = plug(&scene, "n.weight");

        modifier.rollback(&mut scene).unwrap();
        assert_eq!(scene.node_count(), 0);
        modifier.commit(&mut scene).unwrap();
        assert_eq!(plug(&scene, "n.weight"), first);
    }

    #[test]
    fn next_available_fills_free_elements() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("network", Some("n"), None).unwrap();
        scene.create_node("transform", Some("a"), None).unwrap();
        let mut inputs = AttributeObject::create("inputs", "in", AttrCategory::Numeric, Some(DataType::Float));
        inputs.set_array(true);
        let array = scene.add_attribute(node, &inputs, None).unwrap();
        let (tx, ty) = (plug(&scene, "a.tx"), plug(&scene, "a.ty"));

        let mut modifier = Modifier::new("drive");
        modifier.connect_next_available(tx, array).unwrap();
        modifier.connect_next_available(ty, array).unwrap();
        modifier.commit(&mut scene).unwrap();
        assert_eq!(scene.source(array.element(0)).unwrap(), Some(tx));
        assert_eq!(scene.source(array.element(1)).unwrap(), Some(ty));

        modifier.rollback(&mut scene).unwrap();
        assert!(scene.element_indices(array).unwrap().is_empty());
    }

    #[test]
    fn attribute_rename_rolls_back() {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("network", Some("n"), None).unwrap();
        let attr = AttributeObject::create("weight", "w", AttrCategory::Numeric, Some(DataType::Float));
        let weight = scene.add_attribute(node, &attr, None).unwrap();

        let mut modifier = Modifier::new("rename");
        modifier.rename_attribute(weight, "blend", false).unwrap();
        modifier.rename_attribute(weight, "bl", true).unwrap();
        modifier.commit(&mut scene).unwrap();
        assert_eq!(scene.attribute_info(weight).unwrap().long_name, "blend");
        assert_eq!(plug(&scene, "n.bl"), weight);

        modifier.rollback(&mut scene).unwrap();
        let info = scene.attribute_info(weight).unwrap();
        assert_eq!((info.long_name.as_str(), info.short_name.as_str()), ("weight", "w"));
    }

    #[test]
    fn set_membership_rolls_back() {
        let mut scene = MemoryScene::new();
        let set = scene.create_node("objectSet", Some("s"), None).unwrap();
        let a = ObjectHandle::Node(scene.create_node("network", Some("a"), None).unwrap());
        let b = ObjectHandle::Node(scene.create_node("network", Some("b"), None).unwrap());
        scene.add_set_member(set, a).unwrap();

        let mut modifier = Modifier::new("members");
        modifier.add_set_member(set, a).unwrap();
        modifier.add_set_member(set, b).unwrap();
        modifier.remove_set_member(set, a).unwrap();
        modifier.commit(&mut scene).unwrap();
        assert_eq!(scene.set_members(set).unwrap(), vec![b]);

        modifier.rollback(&mut scene).unwrap();
        assert_eq!(scene.set_members(set).unwrap(), vec![a]);
    }

    #[test]
    fn ledger_drives_modifier() {
        let mut scene = MemoryScene::new();
        let ledger = plugwork_core::UndoLedger::<MemoryScene>::default();
        let mut modifier = Modifier::new("ledger");
        modifier.create_node("network", None, None).unwrap();
        modifier.commit(&mut scene).unwrap();
        ledger.record(Box::new(modifier));

        ledger.undo(&mut scene).unwrap();
        assert_eq!(scene.node_count(), 0);
        ledger.redo(&mut scene).unwrap();
        assert_eq!(scene.node_count(), 1);
    }
}
