//! The owner of a scene and everything that edits it.

use std::collections::BTreeMap;
use std::sync::Arc;

use plugwork_core::{CompoundOperation, Operation, UndoLedger};
use plugwork_scene::{AttributeObject, NodeId, ObjectHandle, Plug, SceneGraph};

use crate::attribute::{AttributeBuilder, AttributeDescriptor, StagingBuffer, StagingError};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::factory::{FactoryInput, FromSelection, ObjectRegistry};
use crate::modifier::{Modifier, ModifierError, NodeRef};
use crate::objects::{Attribute, Node, SceneObject};

/// A scene together with its undo ledger, object registry and the staging
/// buffers of the nodes currently receiving attributes.
///
/// # Example
///
/// ```ignore
/// let mut ctx = SceneContext::new(MemoryScene::new());
/// let node = ctx.create_node("transform", Some("rig"), None)?;
///
/// let color = AttributeDescriptor::builder("tint")
///     .with_enum_names("yellow=0:red=10:blue=100")
///     .build()?;
/// node.add_attr(&mut ctx, &color)?;
///
/// ctx.undo()?;
/// ```
pub struct SceneContext<S: SceneGraph> {
    scene: S,
    ledger: Arc<UndoLedger<S>>,
    registry: ObjectRegistry,
    staging: BTreeMap<NodeId, StagingBuffer>,
    config: EngineConfig,
}

impl<S: SceneGraph> SceneContext<S> {
    pub fn new(scene: S) -> Self {
        Self::with_config(scene, EngineConfig::default())
    }

    pub fn with_config(scene: S, config: EngineConfig) -> Self {
        log::debug!(
            "Scene context with undo depth {}, {:?} commits",
            config.undo.max_depth,
            config.modifier.commit_policy
        );
        Self {
            scene,
            ledger: Arc::new(UndoLedger::new(config.undo.max_depth)),
            registry: ObjectRegistry::with_defaults(),
            staging: BTreeMap::new(),
            config,
        }
    }

    /// Replaces the default registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ObjectRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Direct access to the scene. Changes made here bypass the ledger.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn into_scene(self) -> S {
        self.scene
    }

    pub fn ledger(&self) -> &Arc<UndoLedger<S>> {
        &self.ledger
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// An empty modifier using the configured commit policy.
    pub fn modifier(&self, description: impl Into<String>) -> Modifier {
        Modifier::new(description).with_policy(self.config.modifier.commit_policy)
    }

    /// An empty compound using the configured undo order and failure policy.
    pub fn compound(&self, description: impl Into<String>) -> CompoundOperation<S> {
        CompoundOperation::new(description)
            .with_undo_order(self.config.compound.undo_order)
            .with_failure_policy(self.config.compound.failure_policy)
    }

    // Resolution

    /// Wraps a name, handle or component in its most specific type.
    pub fn object(&self, input: impl Into<FactoryInput>) -> EngineResult<SceneObject> {
        Ok(self.registry.create(&self.scene, input)?)
    }

    pub fn node(&self, input: impl Into<FactoryInput>) -> EngineResult<Node> {
        self.object(input)?.into_node()
    }

    pub fn attribute(&self, input: impl Into<FactoryInput>) -> EngineResult<Attribute> {
        self.object(input)?.into_attribute()
    }

    pub fn wrap_node(&self, node: NodeId) -> EngineResult<Node> {
        self.node(node)
    }

    pub fn wrap_attribute(&self, plug: Plug) -> EngineResult<Attribute> {
        self.attribute(plug)
    }

    /// Wraps a raw object handle. Components get their shape's dag path.
    pub fn wrap_handle(&self, handle: ObjectHandle) -> EngineResult<SceneObject> {
        match handle {
            ObjectHandle::Component(component) => {
                let path = self.scene.dag_path(component.node)?;
                self.object((path, component))
            }
            other => self.object(other),
        }
    }

    /// Lazily wraps every item of a selection.
    pub fn selection<'a, I>(&'a self, items: I) -> FromSelection<'a, S, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Into<FactoryInput>,
    {
        self.registry.from_selection(&self.scene, items)
    }

    // Nodes

    /// Stages a node creation and returns the reference later operations of
    /// the same modifier can use.
    pub fn create_node_with(
        &self,
        modifier: &mut Modifier,
        node_type: &str,
        name: Option<&str>,
        parent: Option<&Node>,
    ) -> EngineResult<NodeRef> {
        Ok(modifier.create_node(node_type, name, parent.map(|parent| parent.id().into()))?)
    }

    /// Creates a node as one undoable step.
    pub fn create_node(
        &mut self,
        node_type: &str,
        name: Option<&str>,
        parent: Option<&Node>,
    ) -> EngineResult<Node> {
        let mut modifier = self.modifier(format!("create {}", name.unwrap_or(node_type)));
        let pending = self.create_node_with(&mut modifier, node_type, name, parent)?;
        self.commit_modifier(&mut modifier)?;
        let node = modifier.resolve(pending).ok_or(ModifierError::UnresolvedReference(0))?;
        self.ledger.record(Box::new(modifier));
        self.wrap_node(node)
    }

    // Undo

    /// Commits a modifier and records it as one ledger entry.
    ///
    /// An empty modifier is accepted and not recorded. A partially applied
    /// batch is recorded so the applied part stays undoable, and the commit
    /// error is still returned.
    pub fn commit(&mut self, modifier: Modifier) -> EngineResult {
        self.commit_tracked(modifier).0
    }

    /// Commits like [`commit`](Self::commit) and reports which attributes
    /// were attached, by node.
    fn commit_tracked(
        &mut self,
        mut modifier: Modifier,
    ) -> (EngineResult, BTreeMap<NodeId, Vec<String>>) {
        if modifier.is_empty() {
            return (Ok(()), BTreeMap::new());
        }
        let result = self.commit_modifier(&mut modifier);
        let attached = modifier.attached_attributes();
        if !modifier.applied().is_empty() {
            self.ledger.record(Box::new(modifier));
        }
        (result, attached)
    }

    /// Runs an operation forward and records it if any part of it applied.
    pub fn execute(&mut self, operation: Box<dyn Operation<S>>) -> EngineResult {
        Ok(self.ledger.execute(operation, &mut self.scene)?)
    }

    /// Records an operation that has already run forward.
    pub fn record(&self, operation: Box<dyn Operation<S>>) {
        self.ledger.record(operation);
    }

    pub fn undo(&mut self) -> EngineResult {
        Ok(self.ledger.undo(&mut self.scene)?)
    }

    pub fn redo(&mut self) -> EngineResult {
        Ok(self.ledger.redo(&mut self.scene)?)
    }

    pub fn can_undo(&self) -> bool {
        self.ledger.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.ledger.can_redo()
    }

    // Attributes

    /// Builds `desc` and routes it through the node's staging buffer onto
    /// `modifier`.
    ///
    /// Every long and short name of the built attribute, children included,
    /// must be free on the node, among compounds still waiting for children,
    /// and among attributes already queued on `modifier`. A rejected request
    /// changes nothing.
    pub fn add_attribute_with(
        &mut self,
        node: NodeId,
        desc: &AttributeDescriptor,
        modifier: &mut Modifier,
    ) -> EngineResult {
        let built = AttributeBuilder::build(desc)?;
        self.check_names(node, &built, modifier)?;
        let buffer = self
            .staging
            .entry(node)
            .or_insert_with(|| StagingBuffer::new(node));
        buffer.add(
            &self.scene,
            modifier,
            built,
            desc.children_count(),
            desc.parent(),
        )?;
        Ok(())
    }

    /// Adds an attribute as one undoable step.
    ///
    /// A compound is held until its last child arrives; the call that
    /// completes it attaches the whole tree. When the commit fails, the
    /// node's staging buffer returns to its state before the call, minus any
    /// compound that did get attached.
    pub fn add_attribute(&mut self, node: NodeId, desc: &AttributeDescriptor) -> EngineResult {
        let snapshot = self.staging.get(&node).cloned();
        let mut modifier = self.modifier(format!("add attribute {}", desc.long_name()));
        if let Err(err) = self.add_attribute_with(node, desc, &mut modifier) {
            self.restore_staging(node, snapshot);
            return Err(err);
        }
        let (result, attached) = self.commit_tracked(modifier);
        if result.is_err() {
            self.restore_staging(node, snapshot);
        }
        self.purge_attached(&attached);
        result
    }

    /// Runs `f` against a fresh modifier, then commits it as one ledger entry
    /// and purges the compounds it attached.
    ///
    /// Nothing is committed when `f` fails. On any failure the staging
    /// buffers return to their state before the batch, minus the compounds
    /// that did get attached.
    pub fn batch<T>(
        &mut self,
        description: impl Into<String>,
        f: impl FnOnce(&mut Self, &mut Modifier) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let snapshot = self.staging.clone();
        let mut modifier = self.modifier(description);
        let value = match f(self, &mut modifier) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("Batch '{}' failed before commit", modifier.description());
                self.staging = snapshot;
                return Err(err);
            }
        };
        let (result, attached) = self.commit_tracked(modifier);
        if result.is_err() {
            self.staging = snapshot;
        }
        self.purge_attached(&attached);
        result.map(|()| value)
    }

    fn restore_staging(&mut self, node: NodeId, snapshot: Option<StagingBuffer>) {
        match snapshot {
            Some(buffer) => {
                self.staging.insert(node, buffer);
            }
            None => {
                self.staging.remove(&node);
            }
        }
    }

    /// Drops the queued compounds that a commit attached.
    fn purge_attached(&mut self, attached: &BTreeMap<NodeId, Vec<String>>) -> usize {
        let mut purged = 0;
        for (node, names) in attached {
            let Some(buffer) = self.staging.get_mut(node) else {
                continue;
            };
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            purged += buffer.purge_attached(&names);
            if buffer.is_empty() {
                self.staging.remove(node);
            }
        }
        purged
    }

    /// Drops the queued compounds of one node. Returns how many were dropped.
    pub fn purge(&mut self, node: NodeId) -> usize {
        let Some(buffer) = self.staging.get_mut(&node) else {
            return 0;
        };
        let purged = buffer.purge();
        if buffer.is_empty() {
            self.staging.remove(&node);
        }
        purged
    }

    pub fn purge_all(&mut self) -> usize {
        let nodes: Vec<NodeId> = self.staging.keys().copied().collect();
        nodes.into_iter().map(|node| self.purge(node)).sum()
    }

    pub fn staging(&self, node: NodeId) -> Option<&StagingBuffer> {
        self.staging.get(&node)
    }

    /// Fails with every compound, on any node, still missing children.
    pub fn ensure_staging_complete(&self) -> EngineResult {
        let incomplete: Vec<_> = self
            .staging
            .values()
            .flat_map(StagingBuffer::incomplete)
            .collect();
        if incomplete.is_empty() {
            Ok(())
        } else {
            log::warn!("{} compound(s) never completed", incomplete.len());
            Err(StagingError::Incomplete(incomplete).into())
        }
    }

    /// Clears the ledger and every staging buffer. Call after the scene
    /// itself was reset.
    pub fn reset(&mut self) {
        log::info!("Resetting scene context");
        self.ledger.reset();
        self.staging.clear();
    }

    fn commit_modifier(&mut self, modifier: &mut Modifier) -> EngineResult {
        Ok(modifier.commit(&mut self.scene)?)
    }

    fn check_names(
        &self,
        node: NodeId,
        attribute: &AttributeObject,
        modifier: &Modifier,
    ) -> EngineResult {
        let staged = modifier.staged_attribute_names(node);
        let reserved = self
            .staging
            .get(&node)
            .map(StagingBuffer::reserved_names)
            .unwrap_or_default();
        for name in attribute.all_names() {
            let taken = self.scene.find_attribute(node, name)?.is_some()
                || staged.contains(&name)
                || reserved.contains(&name);
            if taken {
                return Err(EngineError::DuplicateAttributeName {
                    node: self.scene.node_name(node)?,
                    name: name.to_owned(),
                });
            }
        }
        Ok(())
    }
}
