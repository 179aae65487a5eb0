//! Deferred attachment of compound attributes.
//!
//! A compound cannot be attached to a node before it has children. The
//! [`StagingBuffer`] of a node keeps each compound until the declared number
//! of children has been added to it, then queues the finished compound on a
//! [`Modifier`]. Queued entries stay in the buffer, so late children are
//! rejected, until the commit attached them and
//! [`purge_attached`](StagingBuffer::purge_attached) drops them.

use plugwork_scene::{AttrCategory, AttributeObject, NodeId, SceneError, SceneGraph};

use crate::modifier::{Modifier, ModifierError};

/// A compound that has fewer children than it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteCompound {
    pub name: String,
    pub required: usize,
    pub current: usize,
}

/// Error type for staging buffer operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StagingError {
    /// The named parent is neither on the node nor pending.
    #[error("no pending compound named '{0}'")]
    PendingAttributeNotFound(String),
    /// The compound already went to a modifier.
    #[error("compound '{0}' is already queued for attachment")]
    CompoundAlreadyQueued(String),
    #[error("compound '{0}' needs a children count")]
    MissingChildrenCount(String),
    #[error(
        "incomplete compound(s): {}",
        .0.iter().map(|c| format!("{} ({}/{})", c.name, c.current, c.required)).collect::<Vec<_>>().join(", ")
    )]
    Incomplete(Vec<IncompleteCompound>),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Modifier(#[from] ModifierError),
}

pub type StagingResult<T = ()> = Result<T, StagingError>;

#[derive(Debug, Clone)]
struct PendingCompound {
    attribute: AttributeObject,
    required: usize,
    parent: Option<String>,
    queued: bool,
}

impl PendingCompound {
    fn is_ready(&self) -> bool {
        !self.queued && self.attribute.children().len() >= self.required
    }
}

/// Compounds of one node waiting for their children.
#[derive(Debug, Clone)]
pub struct StagingBuffer {
    node: NodeId,
    pending: Vec<PendingCompound>,
}

impl StagingBuffer {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            pending: Vec::new(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether a compound with this long name is held, queued or not.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn is_queued(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|index| self.pending[index].queued)
    }

    /// Every long and short name held by waiting compounds and their
    /// children.
    pub fn reserved_names(&self) -> Vec<&str> {
        self.pending
            .iter()
            .filter(|entry| !entry.queued)
            .flat_map(|entry| entry.attribute.all_names())
            .collect()
    }

    /// Routes a built attribute.
    ///
    /// - no parent, not a compound: queued on `modifier` right away
    /// - no parent, compound: held until `children_count` children arrived
    /// - parent attached to the node: queued as a child of that compound
    /// - parent pending here: added to it, which may make it ready
    ///
    /// A compound that names a parent is held like any other compound and
    /// delivered to its parent once complete.
    pub fn add<S: SceneGraph>(
        &mut self,
        scene: &S,
        modifier: &mut Modifier,
        attribute: AttributeObject,
        children_count: Option<usize>,
        parent: Option<&str>,
    ) -> StagingResult {
        let is_compound = attribute.category() == AttrCategory::Compound;
        let attached_parent = match parent {
            Some(parent) => scene.find_attribute(self.node, parent)?.is_some(),
            None => false,
        };
        if let Some(parent) = parent
            && !attached_parent
        {
            let index = self
                .position(parent)
                .ok_or_else(|| StagingError::PendingAttributeNotFound(parent.to_owned()))?;
            if self.pending[index].queued {
                return Err(StagingError::CompoundAlreadyQueued(parent.to_owned()));
            }
        }

        if is_compound {
            let required = children_count
                .ok_or_else(|| StagingError::MissingChildrenCount(attribute.long_name().to_owned()))?;
            log::debug!(
                "Holding compound '{}' until it has {required} children",
                attribute.long_name()
            );
            self.pending.push(PendingCompound {
                attribute,
                required,
                parent: parent.map(str::to_owned),
                queued: false,
            });
            let index = self.pending.len() - 1;
            return self.evaluate(modifier, index);
        }

        match parent {
            Some(parent) if !attached_parent => {
                // Checked above.
                let Some(index) = self.position(parent) else {
                    return Err(StagingError::PendingAttributeNotFound(parent.to_owned()));
                };
                log::debug!(
                    "Adding '{}' to pending compound '{parent}'",
                    attribute.long_name()
                );
                self.pending[index].attribute.add_child(attribute)?;
                self.evaluate(modifier, index)
            }
            _ => {
                modifier.add_attribute(self.node, attribute, parent)?;
                Ok(())
            }
        }
    }

    /// Queues every compound that is ready, including parents completed by
    /// delivering nested compounds. Returns how many were released.
    pub fn evaluate_all(&mut self, modifier: &mut Modifier) -> StagingResult<usize> {
        let mut released = 0;
        while let Some(index) = self.pending.iter().position(PendingCompound::is_ready) {
            self.release(modifier, index)?;
            released += 1;
        }
        Ok(released)
    }

    /// Drops every queued compound and returns how many were dropped.
    pub fn purge(&mut self) -> usize {
        let before = self.pending.len();
        self.pending.retain(|entry| !entry.queued);
        let purged = before - self.pending.len();
        if purged > 0 {
            log::debug!("Purged {purged} queued compound(s) of {}", self.node);
        }
        purged
    }

    /// Drops the queued compounds attached under one of `names`, and the
    /// compounds that were delivered into them. Returns how many were dropped.
    pub fn purge_attached(&mut self, names: &[&str]) -> usize {
        let mut dropped: Vec<String> = Vec::new();
        loop {
            let next = self.pending.iter().position(|entry| {
                let name = entry.attribute.long_name();
                let delivered = entry
                    .parent
                    .as_ref()
                    .is_some_and(|parent| dropped.contains(parent));
                entry.queued && (names.contains(&name) || delivered)
            });
            let Some(index) = next else {
                break;
            };
            dropped.push(self.pending.remove(index).attribute.long_name().to_owned());
        }
        if !dropped.is_empty() {
            log::debug!("Purged {} attached compound(s) of {}", dropped.len(), self.node);
        }
        dropped.len()
    }

    /// Compounds still waiting for children.
    pub fn incomplete(&self) -> Vec<IncompleteCompound> {
        self.pending
            .iter()
            .filter(|entry| !entry.queued)
            .map(|entry| IncompleteCompound {
                name: entry.attribute.long_name().to_owned(),
                required: entry.required,
                current: entry.attribute.children().len(),
            })
            .collect()
    }

    pub fn ensure_complete(&self) -> StagingResult {
        let incomplete = self.incomplete();
        if incomplete.is_empty() {
            Ok(())
        } else {
            log::warn!("{} compound(s) of {} never completed", incomplete.len(), self.node);
            Err(StagingError::Incomplete(incomplete))
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.pending
            .iter()
            .position(|entry| entry.attribute.long_name() == name)
    }

    fn evaluate(&mut self, modifier: &mut Modifier, index: usize) -> StagingResult {
        if self.pending[index].is_ready() {
            self.release(modifier, index)?;
        }
        Ok(())
    }

    /// Hands a ready compound to its destination: the modifier, or the
    /// pending compound it belongs to.
    fn release(&mut self, modifier: &mut Modifier, index: usize) -> StagingResult {
        let entry = &self.pending[index];
        let name = entry.attribute.long_name().to_owned();
        let pending_parent = entry
            .parent
            .as_deref()
            .and_then(|parent| self.position(parent))
            .filter(|parent| !self.pending[*parent].queued);

        match pending_parent {
            Some(parent) => {
                let attribute = self.pending[index].attribute.clone();
                self.pending[parent].attribute.add_child(attribute)?;
                self.pending[index].queued = true;
                log::debug!(
                    "Compound '{name}' complete, delivered to '{}'",
                    self.pending[parent].attribute.long_name()
                );
                self.evaluate(modifier, parent)
            }
            None => {
                let entry = &self.pending[index];
                modifier.add_attribute(self.node, entry.attribute.clone(), entry.parent.as_deref())?;
                self.pending[index].queued = true;
                log::debug!("Compound '{name}' complete, queued for attachment");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use plugwork_scene::{DataType, MemoryScene};

    use super::*;
    use crate::modifier::ModifierOp;

    fn float(name: &str) -> AttributeObject {
        AttributeObject::create(name, name, AttrCategory::Numeric, Some(DataType::Float))
    }

    fn setup() -> (MemoryScene, NodeId) {
        let mut scene = MemoryScene::new();
        let node = scene.create_node("network", Some("net"), None).unwrap();
        (scene, node)
    }

    fn queued_names(modifier: &Modifier) -> Vec<&str> {
        modifier
            .ops()
            .iter()
            .filter_map(|op| match op {
                ModifierOp::AddAttribute { attribute, .. } => Some(attribute.long_name()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn purge_attached_keeps_compounds_queued_elsewhere() {
        let (scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut first = Modifier::new("first");
        let mut second = Modifier::new("second");
        buffer
            .add(&scene, &mut first, AttributeObject::create_compound("a", "a"), Some(1), None)
            .unwrap();
        buffer.add(&scene, &mut first, float("a1"), None, Some("a")).unwrap();
        buffer
            .add(&scene, &mut second, AttributeObject::create_compound("b", "b"), Some(1), None)
            .unwrap();
        buffer
            .add(&scene, &mut second, AttributeObject::create_compound("inner", "in"), Some(1), Some("b"))
            .unwrap();
        buffer.add(&scene, &mut second, float("x"), None, Some("inner")).unwrap();
        assert!(buffer.is_queued("a") && buffer.is_queued("b"));

        assert_eq!(buffer.purge_attached(&["b"]), 2);
        assert!(buffer.is_queued("a"));
        assert!(!buffer.contains("inner"));
        assert_eq!(buffer.purge_attached(&["missing"]), 0);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn plain_attribute_goes_straight_to_modifier() {
        let (scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("plain");
        buffer
            .add(&scene, &mut modifier, float("weight"), None, None)
            .unwrap();
        assert!(buffer.is_empty());
        assert_eq!(queued_names(&modifier), ["weight"]);
    }

    #[test]
    fn compound_ready_after_exactly_k_children() {
        let (scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("compound");
        buffer
            .add(
                &scene,
                &mut modifier,
                AttributeObject::create_compound("limits", "lim"),
                Some(3),
                None,
            )
            .unwrap();
        for (i, name) in ["low", "high"].into_iter().enumerate() {
            buffer
                .add(&scene, &mut modifier, float(name), None, Some("limits"))
                .unwrap();
            assert!(modifier.is_empty(), "queued after {} children", i + 1);
        }
        buffer
            .add(&scene, &mut modifier, float("step"), None, Some("limits"))
            .unwrap();
        assert_eq!(queued_names(&modifier), ["limits"]);
        assert!(buffer.is_queued("limits"));

        assert!(matches!(
            buffer.add(&scene, &mut modifier, float("late"), None, Some("limits")),
            Err(StagingError::CompoundAlreadyQueued(_))
        ));
    }

    #[test]
    fn purge_is_idempotent() {
        let (mut scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("purge");
        buffer
            .add(
                &scene,
                &mut modifier,
                AttributeObject::create_compound("pair", "pr"),
                Some(1),
                None,
            )
            .unwrap();
        buffer
            .add(&scene, &mut modifier, float("first"), None, Some("pair"))
            .unwrap();
        modifier.commit(&mut scene).unwrap();

        assert_eq!(buffer.purge(), 1);
        assert_eq!(buffer.purge(), 0);
        assert!(buffer.is_empty());
        assert!(scene.find_attribute(node, "first").unwrap().is_some());
    }

    #[test]
    fn missing_parent_is_reported() {
        let (scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("orphan");
        assert!(matches!(
            buffer.add(&scene, &mut modifier, float("x"), None, Some("ghost")),
            Err(StagingError::PendingAttributeNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn child_of_attached_compound_is_queued_directly() {
        let (mut scene, node) = setup();
        let mut group = AttributeObject::create_compound("group", "grp");
        group.add_child(float("a")).unwrap();
        scene.add_attribute(node, &group, None).unwrap();

        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("attached");
        buffer
            .add(&scene, &mut modifier, float("b"), None, Some("group"))
            .unwrap();
        assert!(buffer.is_empty());
        modifier.commit(&mut scene).unwrap();
        let group = scene.find_attribute(node, "group").unwrap().unwrap();
        assert_eq!(scene.plug_children(group).unwrap().len(), 2);
    }

    #[test]
    fn nested_compound_is_delivered_to_parent() {
        let (mut scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("nested");
        buffer
            .add(
                &scene,
                &mut modifier,
                AttributeObject::create_compound("outer", "out"),
                Some(2),
                None,
            )
            .unwrap();
        buffer
            .add(
                &scene,
                &mut modifier,
                AttributeObject::create_compound("inner", "in"),
                Some(1),
                Some("outer"),
            )
            .unwrap();
        buffer
            .add(&scene, &mut modifier, float("leaf"), None, Some("inner"))
            .unwrap();
        assert!(modifier.is_empty());
        buffer
            .add(&scene, &mut modifier, float("tail"), None, Some("outer"))
            .unwrap();
        assert_eq!(queued_names(&modifier), ["outer"]);

        modifier.commit(&mut scene).unwrap();
        assert!(scene.find_attribute(node, "leaf").unwrap().is_some());
        assert_eq!(buffer.purge(), 2);
    }

    #[test]
    fn incomplete_compounds_are_surfaced() {
        let (scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("incomplete");
        buffer
            .add(
                &scene,
                &mut modifier,
                AttributeObject::create_compound("triple", "tr"),
                Some(3),
                None,
            )
            .unwrap();
        buffer
            .add(&scene, &mut modifier, float("one"), None, Some("triple"))
            .unwrap();
        assert_eq!(
            buffer.incomplete(),
            vec![IncompleteCompound {
                name: "triple".into(),
                required: 3,
                current: 1
            }]
        );
        let err = buffer.ensure_complete().unwrap_err();
        assert_eq!(err.to_string(), "incomplete compound(s): triple (1/3)");
        assert_eq!(buffer.reserved_names(), ["triple", "tr", "one", "one"]);
    }

    #[test]
    fn prebuilt_compound_is_released_on_add() {
        let (scene, node) = setup();
        let mut buffer = StagingBuffer::new(node);
        let mut modifier = Modifier::new("bulk");
        let mut prebuilt = AttributeObject::create_compound("prebuilt", "pb");
        prebuilt.add_child(float("only")).unwrap();
        buffer
            .add(&scene, &mut modifier, prebuilt, Some(1), None)
            .unwrap();
        assert_eq!(buffer.evaluate_all(&mut modifier).unwrap(), 0);
        assert_eq!(queued_names(&modifier), ["prebuilt"]);
    }
}
