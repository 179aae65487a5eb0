//! In-memory reference scene.
//!
//! [`MemoryScene`] implements [`SceneGraph`] without a host application. Node
//! names are globally unique; a taken name gets a numeric suffix. Removed
//! nodes and attributes stay in their slot so they can be restored under the
//! same handle.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use plugwork_core::Editable;

use crate::attribute::{AttributeFlags, AttributeInfo, AttributeObject};
use crate::error::{SceneError, SceneResult};
use crate::graph::{PlugFlag, SceneGraph};
use crate::handle::{AttrKey, ComponentId, ComponentKind, DagPath, NameTarget, NodeId, ObjectHandle, Plug};
use crate::types::{AttrCategory, DataType, FnSet};
use crate::value::PlugValue;

struct NodeType {
    name: &'static str,
    functions: FnSet,
}

const DG: FnSet = FnSet::DEPENDENCY_NODE;
const DAG: FnSet = FnSet::DEPENDENCY_NODE.union(FnSet::DAG_NODE);
const XFORM: FnSet = DAG.union(FnSet::TRANSFORM);

const NODE_TYPES: &[NodeType] = &[
    NodeType { name: "transform", functions: XFORM },
    NodeType { name: "joint", functions: XFORM.union(FnSet::JOINT) },
    NodeType { name: "mesh", functions: DAG.union(FnSet::SHAPE) },
    NodeType { name: "locator", functions: DAG.union(FnSet::SHAPE) },
    NodeType { name: "multiplyDivide", functions: DG },
    NodeType { name: "plusMinusAverage", functions: DG },
    NodeType { name: "network", functions: DG },
    NodeType { name: "objectSet", functions: DG.union(FnSet::SET) },
];

/// Node types [`MemoryScene`] can create.
pub fn node_type_names() -> impl Iterator<Item = &'static str> {
    NODE_TYPES.iter().map(|t| t.name)
}

#[derive(Debug)]
struct AttrSlot {
    long_name: String,
    short_name: String,
    category: AttrCategory,
    data_type: Option<DataType>,
    min: Option<PlugValue>,
    max: Option<PlugValue>,
    enum_fields: Vec<(String, i32)>,
    flags: AttributeFlags,
    value: Option<PlugValue>,
    parent: Option<AttrKey>,
    children: Vec<AttrKey>,
    keyable: bool,
    locked: bool,
    channel_box: bool,
    dynamic: bool,
    /// Written elements of an array; `value` is the element default.
    elements: BTreeMap<u32, PlugValue>,
}

impl AttrSlot {
    fn matches(&self, name: &str) -> bool {
        self.long_name == name || self.short_name == name
    }

    fn holds_elements(&self) -> bool {
        self.flags.contains(AttributeFlags::ARRAY) && self.children.is_empty()
    }
}

/// A removed attribute subtree, root first.
#[derive(Debug)]
struct DetachedAttr {
    slots: Vec<(AttrKey, AttrSlot)>,
    /// Position among the parent's children.
    position: usize,
    severed: Vec<(Plug, Plug)>,
}

#[derive(Debug)]
struct NodeSlot {
    name: String,
    type_name: &'static str,
    functions: FnSet,
    alive: bool,
    locked: bool,
    parent: Option<NodeId>,
    attrs: Vec<Option<AttrSlot>>,
    detached: HashMap<AttrKey, DetachedAttr>,
    /// Connections cut when the node was removed.
    severed: Vec<(Plug, Plug)>,
    /// Object set membership, in insertion order.
    members: Vec<ObjectHandle>,
}

impl NodeSlot {
    fn live_attrs(&self) -> impl Iterator<Item = (AttrKey, &AttrSlot)> {
        self.attrs
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (AttrKey(i as u32), s)))
    }
}

/// A scene graph held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: Vec<NodeSlot>,
    names: HashMap<String, NodeId>,
    /// `(source, destination)` pairs.
    connections: Vec<(Plug, Plug)>,
}

impl Editable for MemoryScene {}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Live node ids in creation order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive)
            .map(|(i, _)| NodeId::from_raw(i as u32))
            .collect()
    }

    /// Every connection as `(source, destination)`.
    pub fn connections(&self) -> &[(Plug, Plug)] {
        &self.connections
    }

    fn slot(&self, node: NodeId) -> SceneResult<&NodeSlot> {
        match self.nodes.get(node.index() as usize) {
            Some(slot) if slot.alive => Ok(slot),
            Some(_) => Err(SceneError::DeadNode(node)),
            None => Err(SceneError::NotFound(node.to_string())),
        }
    }

    fn slot_mut(&mut self, node: NodeId) -> SceneResult<&mut NodeSlot> {
        match self.nodes.get_mut(node.index() as usize) {
            Some(slot) if slot.alive => Ok(slot),
            Some(_) => Err(SceneError::DeadNode(node)),
            None => Err(SceneError::NotFound(node.to_string())),
        }
    }

    /// The attribute behind a plug. Element plugs need a non-compound array.
    fn attr(&self, plug: Plug) -> SceneResult<&AttrSlot> {
        let attr = self
            .slot(plug.node)?
            .attrs
            .get(plug.attr.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| SceneError::InvalidHandle(format!("{plug:?}")))?;
        if plug.index.is_some() && !attr.holds_elements() {
            return Err(SceneError::InvalidHandle(format!(
                "'{}' has no elements",
                attr.long_name
            )));
        }
        Ok(attr)
    }

    fn attr_mut(&mut self, plug: Plug) -> SceneResult<&mut AttrSlot> {
        let attr = self
            .slot_mut(plug.node)?
            .attrs
            .get_mut(plug.attr.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| SceneError::InvalidHandle(format!("{plug:?}")))?;
        if plug.index.is_some() && !attr.holds_elements() {
            return Err(SceneError::InvalidHandle(format!(
                "'{}' has no elements",
                attr.long_name
            )));
        }
        Ok(attr)
    }

    fn handle_alive(&self, handle: &ObjectHandle) -> bool {
        match handle {
            ObjectHandle::Node(node) => self.is_alive(*node),
            ObjectHandle::Attribute(plug) => self.attr(*plug).is_ok(),
            ObjectHandle::Component(_) => self.object_functions(handle).is_ok(),
        }
    }

    fn set_slot_mut(&mut self, set: NodeId) -> SceneResult<&mut NodeSlot> {
        let slot = self.slot_mut(set)?;
        if slot.functions.contains(FnSet::SET) {
            Ok(slot)
        } else {
            Err(SceneError::TypeMismatch(format!(
                "'{}' is not an object set",
                slot.name
            )))
        }
    }

    fn validate_name(name: &str) -> SceneResult {
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(())
        } else {
            Err(SceneError::InvalidHandle(format!("invalid name '{name}'")))
        }
    }

    /// `base` if free, otherwise `base` with its trailing digits replaced by
    /// the first free counter.
    fn unique_name(&self, base: &str) -> String {
        if !self.names.contains_key(base) {
            return base.to_owned();
        }
        let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
        (1..)
            .map(|n| format!("{stem}{n}"))
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or_else(|| base.to_owned())
    }

    fn builtin_attributes(functions: FnSet) -> Vec<AttributeObject> {
        let mut attrs = vec![AttributeObject::create(
            "message",
            "msg",
            AttrCategory::Message,
            Some(DataType::Message),
        )];
        if functions.contains(FnSet::DAG_NODE) {
            let mut visibility =
                AttributeObject::create("visibility", "v", AttrCategory::Numeric, Some(DataType::Bool));
            visibility.set_keyable(true);
            let seeded = visibility.set_default(PlugValue::Bool(true));
            debug_assert!(seeded.is_ok(), "visibility default: {seeded:?}");
            attrs.push(visibility);
        }
        if functions.contains(FnSet::TRANSFORM) {
            for (long, short, default) in [
                ("translate", "t", 0.0),
                ("rotate", "r", 0.0),
                ("scale", "s", 1.0),
            ] {
                let mut attr = AttributeObject::create_point(long, short);
                let seeded = attr.set_default(PlugValue::Double3([default; 3]));
                debug_assert!(seeded.is_ok(), "{long} default: {seeded:?}");
                for child in attr.children_mut() {
                    child.set_keyable(true);
                }
                attrs.push(attr);
            }
        }
        if functions.contains(FnSet::JOINT) {
            let mut radius =
                AttributeObject::create("radius", "radi", AttrCategory::Numeric, Some(DataType::Float));
            let seeded = radius
                .set_default(PlugValue::Float(1.0))
                .and_then(|()| radius.set_min(PlugValue::Float(0.0)));
            debug_assert!(seeded.is_ok(), "radius bounds: {seeded:?}");
            attrs.push(radius);
        }
        attrs
    }

    fn insert_attr(
        slot: &mut NodeSlot,
        attribute: &AttributeObject,
        parent: Option<AttrKey>,
        dynamic: bool,
    ) -> AttrKey {
        let key = AttrKey(slot.attrs.len() as u32);
        let flags = attribute.flags();
        let value = if attribute.children().is_empty() {
            attribute
                .default_value()
                .cloned()
                .or_else(|| attribute.data_type().and_then(PlugValue::zero_for))
        } else {
            None
        };
        slot.attrs.push(Some(AttrSlot {
            long_name: attribute.long_name().to_owned(),
            short_name: attribute.short_name().to_owned(),
            category: attribute.category(),
            data_type: attribute.data_type(),
            min: attribute.min().cloned(),
            max: attribute.max().cloned(),
            enum_fields: attribute.enum_fields().to_vec(),
            flags,
            value,
            parent,
            children: Vec::new(),
            keyable: flags.contains(AttributeFlags::KEYABLE),
            locked: false,
            channel_box: flags.contains(AttributeFlags::CHANNEL_BOX),
            dynamic,
            elements: BTreeMap::new(),
        }));

        let children: Vec<AttrKey> = attribute
            .children()
            .iter()
            .map(|child| Self::insert_attr(slot, child, Some(key), dynamic))
            .collect();

        // A vector default seeds the children.
        if let Some(parts) = attribute.default_value().and_then(PlugValue::split)
            && parts.len() == children.len()
        {
            for (child, part) in children.iter().zip(parts) {
                if let Some(Some(child_slot)) = slot.attrs.get_mut(child.0 as usize) {
                    child_slot.value = Some(part);
                }
            }
        }
        if let Some(Some(own)) = slot.attrs.get_mut(key.0 as usize) {
            own.children = children;
        }
        key
    }

    fn collect_subtree(slot: &NodeSlot, key: AttrKey, out: &mut Vec<AttrKey>) {
        out.push(key);
        if let Some(Some(attr)) = slot.attrs.get(key.0 as usize) {
            for child in &attr.children {
                Self::collect_subtree(slot, *child, out);
            }
        }
    }

    fn has_empty_compound(attribute: &AttributeObject) -> Option<&str> {
        if attribute.category() == AttrCategory::Compound && attribute.children().is_empty() {
            return Some(attribute.long_name());
        }
        attribute.children().iter().find_map(Self::has_empty_compound)
    }

    fn join_children(data_type: Option<DataType>, values: Vec<PlugValue>) -> PlugValue {
        let floats: Option<Vec<f64>> = values.iter().map(PlugValue::as_float).collect();
        let ints: Option<Vec<i32>> = values.iter().map(PlugValue::as_int).collect();
        match (data_type, floats.as_deref(), ints.as_deref()) {
            (Some(DataType::Float2), Some(&[a, b]), _) => PlugValue::Double2([a, b]),
            (Some(DataType::Float3 | DataType::Point | DataType::Color), Some(&[a, b, c]), _) => {
                PlugValue::Double3([a, b, c])
            }
            (Some(DataType::Float4), Some(&[a, b, c, d]), _) => PlugValue::Double4([a, b, c, d]),
            (Some(DataType::Int2), _, Some(&[a, b])) => PlugValue::Int2([a, b]),
            (Some(DataType::Int3), _, Some(&[a, b, c])) => PlugValue::Int3([a, b, c]),
            _ => PlugValue::Compound(values),
        }
    }

    fn check_leaf(&self, plug: Plug, value: &PlugValue) -> SceneResult {
        let attr = self.attr(plug)?;
        if attr.locked {
            return Err(SceneError::Locked(self.plug_name(plug)?));
        }
        let data_type = attr.data_type.ok_or_else(|| {
            SceneError::TypeMismatch(format!("'{}' holds no value", attr.long_name))
        })?;
        if !value.fits(data_type) {
            return Err(SceneError::TypeMismatch(format!(
                "'{}' expects {data_type:?}, got {}",
                attr.long_name,
                value.type_name()
            )));
        }
        if data_type == DataType::Enum
            && let Some(v) = value.as_int()
            && !attr.enum_fields.iter().any(|(_, field)| *field == v)
        {
            return Err(SceneError::OutOfRange(format!(
                "{v} is not a field of '{}'",
                attr.long_name
            )));
        }
        let components = value.components().unwrap_or_default();
        let below = attr
            .min
            .as_ref()
            .and_then(PlugValue::components)
            .is_some_and(|min| components.iter().zip(&min).any(|(v, m)| v < m));
        let above = attr
            .max
            .as_ref()
            .and_then(PlugValue::components)
            .is_some_and(|max| components.iter().zip(&max).any(|(v, m)| v > m));
        if below || above {
            return Err(SceneError::OutOfRange(format!(
                "{value:?} for '{}'",
                attr.long_name
            )));
        }
        Ok(())
    }

    fn sever(&mut self, keep: impl Fn(&(Plug, Plug)) -> bool) -> Vec<(Plug, Plug)> {
        let (kept, cut): (Vec<_>, Vec<_>) = self.connections.drain(..).partition(|c| keep(c));
        self.connections = kept;
        cut
    }
}

impl SceneGraph for MemoryScene {
    fn resolve_name(&self, name: &str) -> SceneResult<NameTarget> {
        if let Some(prefix) = name.strip_suffix('*') {
            let mut matches = self.names.iter().filter(|(n, _)| n.starts_with(prefix));
            return match (matches.next(), matches.next()) {
                (Some((_, id)), None) => Ok(NameTarget::Node(*id)),
                (None, _) => Err(SceneError::NotFound(name.to_owned())),
                (Some(_), Some(_)) => Err(SceneError::NotUnique(name.to_owned())),
            };
        }

        let Some((node_name, rest)) = name.split_once('.') else {
            return self
                .names
                .get(name)
                .map(|id| NameTarget::Node(*id))
                .ok_or_else(|| SceneError::NotFound(name.to_owned()));
        };
        let node = *self
            .names
            .get(node_name)
            .ok_or_else(|| SceneError::NotFound(name.to_owned()))?;

        if let Some((token, index)) = rest.split_once('[') {
            let index: u32 = index
                .strip_suffix(']')
                .and_then(|i| i.parse().ok())
                .ok_or_else(|| SceneError::NotFound(name.to_owned()))?;
            let Some(kind) = ComponentKind::from_token(token) else {
                let attr_name = token.rsplit('.').next().unwrap_or(token);
                let element = self
                    .find_attribute(node, attr_name)?
                    .ok_or_else(|| SceneError::NotFound(name.to_owned()))?
                    .element(index);
                self.attr(element)?;
                return Ok(NameTarget::Plug(element));
            };
            if !self.slot(node)?.functions.contains(FnSet::SHAPE) {
                return Err(SceneError::InvalidHandle(format!(
                    "'{node_name}' has no components"
                )));
            }
            let path = self.dag_path(node)?;
            return Ok(NameTarget::Component(path, ComponentId { node, kind, index }));
        }

        let attr_name = rest.rsplit('.').next().unwrap_or(rest);
        self.find_attribute(node, attr_name)?
            .map(NameTarget::Plug)
            .ok_or_else(|| SceneError::NotFound(name.to_owned()))
    }

    fn object_functions(&self, handle: &ObjectHandle) -> SceneResult<FnSet> {
        match handle {
            ObjectHandle::Node(node) => Ok(self.slot(*node)?.functions),
            ObjectHandle::Attribute(plug) => {
                let attr = self.attr(*plug)?;
                let mut set = attr.category.fn_set();
                if !attr.children.is_empty() {
                    set |= FnSet::COMPOUND;
                }
                Ok(set)
            }
            ObjectHandle::Component(component) => {
                if self.slot(component.node)?.functions.contains(FnSet::SHAPE) {
                    Ok(FnSet::COMPONENT)
                } else {
                    Err(SceneError::InvalidHandle(format!("{component:?}")))
                }
            }
        }
    }

    fn attribute_info(&self, plug: Plug) -> SceneResult<AttributeInfo> {
        let attr = self.attr(plug)?;
        let mut functions = attr.category.fn_set();
        if !attr.children.is_empty() {
            functions |= FnSet::COMPOUND;
        }
        Ok(AttributeInfo {
            long_name: attr.long_name.clone(),
            short_name: attr.short_name.clone(),
            category: attr.category,
            data_type: attr.data_type,
            is_array: attr.flags.contains(AttributeFlags::ARRAY),
            children_count: attr.children.len(),
            enum_fields: attr.enum_fields.clone(),
            functions,
        })
    }

    fn dag_path(&self, node: NodeId) -> SceneResult<DagPath> {
        let slot = self.slot(node)?;
        if !slot.functions.contains(FnSet::DAG_NODE) {
            return Err(SceneError::InvalidHandle(format!(
                "'{}' is not a dag node",
                slot.name
            )));
        }
        let mut nodes = vec![node];
        let mut current = slot.parent;
        while let Some(parent) = current {
            nodes.push(parent);
            current = self.slot(parent)?.parent;
        }
        nodes.reverse();
        Ok(DagPath::new(nodes))
    }

    fn is_alive(&self, node: NodeId) -> bool {
        self.slot(node).is_ok()
    }

    fn node_name(&self, node: NodeId) -> SceneResult<String> {
        Ok(self.slot(node)?.name.clone())
    }

    fn node_type(&self, node: NodeId) -> SceneResult<String> {
        Ok(self.slot(node)?.type_name.to_owned())
    }

    fn create_node(
        &mut self,
        node_type: &str,
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> SceneResult<NodeId> {
        let info = NODE_TYPES
            .iter()
            .find(|t| t.name == node_type)
            .ok_or_else(|| SceneError::UnknownNodeType(node_type.to_owned()))?;
        if let Some(parent) = parent {
            let parent_slot = self.slot(parent)?;
            if !info.functions.contains(FnSet::DAG_NODE)
                || !parent_slot.functions.contains(FnSet::TRANSFORM)
            {
                return Err(SceneError::InvalidParent(format!(
                    "'{node_type}' cannot be parented under '{}'",
                    parent_slot.name
                )));
            }
        }
        let base = match name {
            Some(name) => {
                Self::validate_name(name)?;
                name.to_owned()
            }
            None => format!("{node_type}1"),
        };
        let name = self.unique_name(&base);

        let id = NodeId::from_raw(self.nodes.len() as u32);
        let mut slot = NodeSlot {
            name: name.clone(),
            type_name: info.name,
            functions: info.functions,
            alive: true,
            locked: false,
            parent,
            attrs: Vec::new(),
            detached: HashMap::new(),
            severed: Vec::new(),
            members: Vec::new(),
        };
        for attribute in Self::builtin_attributes(info.functions) {
            Self::insert_attr(&mut slot, &attribute, None, false);
        }
        self.nodes.push(slot);
        self.names.insert(name.clone(), id);
        log::debug!("Created {node_type} '{name}' ({id})");
        Ok(id)
    }

    fn remove_node(&mut self, node: NodeId) -> SceneResult {
        let slot = self.slot(node)?;
        if slot.locked {
            return Err(SceneError::Locked(slot.name.clone()));
        }
        if !self.children(node)?.is_empty() {
            return Err(SceneError::InvalidHandle(format!(
                "'{}' still has children",
                slot.name
            )));
        }
        let severed = self.sever(|(src, dst)| src.node != node && dst.node != node);
        let slot = self.slot_mut(node)?;
        slot.alive = false;
        slot.severed = severed;
        let name = slot.name.clone();
        self.names.remove(&name);
        log::debug!("Removed '{name}' ({node})");
        Ok(())
    }

    fn restore_node(&mut self, node: NodeId) -> SceneResult {
        let slot = self
            .nodes
            .get(node.index() as usize)
            .ok_or_else(|| SceneError::NotFound(node.to_string()))?;
        if slot.alive {
            return Err(SceneError::InvalidHandle(format!("{node} is alive")));
        }
        if let Some(parent) = slot.parent
            && !self.is_alive(parent)
        {
            return Err(SceneError::InvalidParent(format!(
                "parent of '{}' is gone",
                slot.name
            )));
        }
        let name = self.unique_name(&slot.name);
        let severed = std::mem::take(&mut self.nodes[node.index() as usize].severed);
        {
            let slot = &mut self.nodes[node.index() as usize];
            slot.alive = true;
            slot.name = name.clone();
        }
        self.names.insert(name.clone(), node);
        for (src, dst) in severed {
            let reachable = self.attr(src).is_ok() && self.attr(dst).is_ok();
            if reachable && matches!(self.source(dst), Ok(None)) {
                self.connections.push((src, dst));
            } else {
                log::warn!("Dropping connection {src:?} -> {dst:?} while restoring '{name}'");
            }
        }
        log::debug!("Restored '{name}' ({node})");
        Ok(())
    }

    fn rename_node(&mut self, node: NodeId, name: &str) -> SceneResult<String> {
        let slot = self.slot(node)?;
        if slot.locked {
            return Err(SceneError::Locked(slot.name.clone()));
        }
        if slot.name == name {
            return Ok(name.to_owned());
        }
        Self::validate_name(name)?;
        let old = slot.name.clone();
        let new = self.unique_name(name);
        self.names.remove(&old);
        self.names.insert(new.clone(), node);
        self.slot_mut(node)?.name = new.clone();
        log::debug!("Renamed '{old}' to '{new}'");
        Ok(new)
    }

    fn is_node_locked(&self, node: NodeId) -> SceneResult<bool> {
        Ok(self.slot(node)?.locked)
    }

    fn set_node_locked(&mut self, node: NodeId, locked: bool) -> SceneResult<bool> {
        let slot = self.slot_mut(node)?;
        Ok(std::mem::replace(&mut slot.locked, locked))
    }

    fn parent(&self, node: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.slot(node)?.parent)
    }

    fn children(&self, node: NodeId) -> SceneResult<Vec<NodeId>> {
        self.slot(node)?;
        Ok(self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive && n.parent == Some(node))
            .map(|(i, _)| NodeId::from_raw(i as u32))
            .collect())
    }

    fn find_attribute(&self, node: NodeId, name: &str) -> SceneResult<Option<Plug>> {
        let slot = self.slot(node)?;
        let by_long = slot.live_attrs().find(|(_, a)| a.long_name == name);
        let found = by_long.or_else(|| slot.live_attrs().find(|(_, a)| a.short_name == name));
        Ok(found.map(|(key, _)| Plug::new(node, key)))
    }

    fn attributes(&self, node: NodeId) -> SceneResult<Vec<Plug>> {
        Ok(self
            .slot(node)?
            .live_attrs()
            .filter(|(_, a)| a.parent.is_none())
            .map(|(key, _)| Plug::new(node, key))
            .collect())
    }

    fn add_attribute(
        &mut self,
        node: NodeId,
        attribute: &AttributeObject,
        parent: Option<&str>,
    ) -> SceneResult<Plug> {
        let slot = self.slot(node)?;
        if slot.locked {
            return Err(SceneError::Locked(slot.name.clone()));
        }
        if let Some(empty) = Self::has_empty_compound(attribute) {
            return Err(SceneError::EmptyCompound(empty.to_owned()));
        }
        for name in attribute.all_names() {
            if slot.live_attrs().any(|(_, a)| a.matches(name)) {
                return Err(SceneError::DuplicateName {
                    node: slot.name.clone(),
                    name: name.to_owned(),
                });
            }
        }
        let parent_key = match parent {
            Some(parent_name) => {
                let plug = self.find_attribute(node, parent_name)?.ok_or_else(|| {
                    SceneError::NotFound(format!("{}.{parent_name}", slot.name))
                })?;
                if self.attr(plug)?.category != AttrCategory::Compound {
                    return Err(SceneError::TypeMismatch(format!(
                        "'{parent_name}' is not a compound"
                    )));
                }
                Some(plug.attr)
            }
            None => None,
        };

        let slot = self.slot_mut(node)?;
        let key = Self::insert_attr(slot, attribute, parent_key, true);
        if let Some(parent_key) = parent_key
            && let Some(Some(parent_slot)) = slot.attrs.get_mut(parent_key.0 as usize)
        {
            parent_slot.children.push(key);
        }
        log::debug!(
            "Added attribute '{}' to '{}'",
            attribute.long_name(),
            slot.name
        );
        Ok(Plug::new(node, key))
    }

    fn remove_attribute(&mut self, plug: Plug) -> SceneResult {
        if plug.index.is_some() {
            return Err(SceneError::InvalidHandle(format!(
                "cannot remove element {}",
                self.plug_name(plug)?
            )));
        }
        let attr = self.attr(plug)?;
        if !attr.dynamic {
            return Err(SceneError::InvalidHandle(format!(
                "'{}' is a static attribute",
                attr.long_name
            )));
        }
        let parent = attr.parent;
        let mut keys = Vec::new();
        Self::collect_subtree(self.slot(plug.node)?, plug.attr, &mut keys);
        let doomed: Vec<Plug> = keys.iter().map(|k| Plug::new(plug.node, *k)).collect();
        let severed = self.sever(|(src, dst)| {
            !doomed
                .iter()
                .any(|d| d.same_attribute(src) || d.same_attribute(dst))
        });
        if !severed.is_empty() {
            log::debug!("Removing attribute cut {} connection(s)", severed.len());
        }
        let slot = self.slot_mut(plug.node)?;
        let mut position = 0;
        if let Some(parent) = parent
            && let Some(Some(parent_slot)) = slot.attrs.get_mut(parent.0 as usize)
        {
            position = parent_slot
                .children
                .iter()
                .position(|k| *k == plug.attr)
                .unwrap_or(parent_slot.children.len());
            parent_slot.children.retain(|k| *k != plug.attr);
        }
        let slots = keys
            .into_iter()
            .filter_map(|key| {
                slot.attrs
                    .get_mut(key.0 as usize)
                    .and_then(Option::take)
                    .map(|attr| (key, attr))
            })
            .collect();
        slot.detached.insert(
            plug.attr,
            DetachedAttr {
                slots,
                position,
                severed,
            },
        );
        Ok(())
    }

    fn restore_attribute(&mut self, plug: Plug) -> SceneResult {
        let slot = self.slot(plug.node)?;
        if slot.locked {
            return Err(SceneError::Locked(slot.name.clone()));
        }
        let detached = slot.detached.get(&plug.attr).ok_or_else(|| {
            SceneError::InvalidHandle(format!("{plug:?} is not a removed attribute"))
        })?;
        for (_, attr) in &detached.slots {
            for name in [&attr.long_name, &attr.short_name] {
                if slot.live_attrs().any(|(_, a)| a.matches(name)) {
                    return Err(SceneError::DuplicateName {
                        node: slot.name.clone(),
                        name: name.clone(),
                    });
                }
            }
        }
        let parent = detached.slots.first().and_then(|(_, attr)| attr.parent);
        if let Some(parent) = parent
            && slot.attrs.get(parent.0 as usize).and_then(Option::as_ref).is_none()
        {
            return Err(SceneError::InvalidParent(format!(
                "parent compound of {plug:?} is gone"
            )));
        }

        let slot = self.slot_mut(plug.node)?;
        let Some(detached) = slot.detached.remove(&plug.attr) else {
            return Err(SceneError::InvalidHandle(format!("{plug:?}")));
        };
        for (key, attr) in detached.slots {
            if let Some(entry) = slot.attrs.get_mut(key.0 as usize) {
                *entry = Some(attr);
            }
        }
        if let Some(parent) = parent
            && let Some(Some(parent_slot)) = slot.attrs.get_mut(parent.0 as usize)
        {
            let position = detached.position.min(parent_slot.children.len());
            parent_slot.children.insert(position, plug.attr);
        }
        let name = slot.name.clone();
        for (src, dst) in detached.severed {
            let reachable = self.attr(src).is_ok() && self.attr(dst).is_ok();
            if reachable && matches!(self.source(dst), Ok(None)) {
                self.connections.push((src, dst));
            } else {
                log::warn!("Dropping connection {src:?} -> {dst:?} while restoring on '{name}'");
            }
        }
        log::debug!("Restored attribute {:?} on '{name}'", plug.attr);
        Ok(())
    }

    fn rename_attribute(&mut self, plug: Plug, name: &str, short: bool) -> SceneResult<String> {
        if plug.index.is_some() {
            return Err(SceneError::InvalidHandle(format!(
                "cannot rename element {}",
                self.plug_name(plug)?
            )));
        }
        let slot = self.slot(plug.node)?;
        if slot.locked {
            return Err(SceneError::Locked(slot.name.clone()));
        }
        let attr = self.attr(plug)?;
        if !attr.dynamic {
            return Err(SceneError::InvalidHandle(format!(
                "'{}' is a static attribute",
                attr.long_name
            )));
        }
        let current = if short { &attr.short_name } else { &attr.long_name };
        if current == name {
            return Ok(name.to_owned());
        }
        Self::validate_name(name)?;
        let taken = slot
            .live_attrs()
            .any(|(key, a)| key != plug.attr && a.matches(name));
        if taken {
            return Err(SceneError::DuplicateName {
                node: slot.name.clone(),
                name: name.to_owned(),
            });
        }
        let attr = self.attr_mut(plug)?;
        let field = if short {
            &mut attr.short_name
        } else {
            &mut attr.long_name
        };
        let old = std::mem::replace(field, name.to_owned());
        log::debug!("Renamed attribute '{old}' to '{name}'");
        Ok(old)
    }

    fn element_indices(&self, plug: Plug) -> SceneResult<Vec<u32>> {
        let array = plug.array();
        let attr = self.attr(array)?;
        if !attr.flags.contains(AttributeFlags::ARRAY) {
            return Err(SceneError::TypeMismatch(format!(
                "'{}' is not an array",
                attr.long_name
            )));
        }
        let mut indices: BTreeSet<u32> = attr.elements.keys().copied().collect();
        for (src, dst) in &self.connections {
            for end in [src, dst] {
                if end.same_attribute(&array)
                    && let Some(index) = end.index
                {
                    indices.insert(index);
                }
            }
        }
        Ok(indices.into_iter().collect())
    }

    fn plug_children(&self, plug: Plug) -> SceneResult<Vec<Plug>> {
        Ok(self
            .attr(plug)?
            .children
            .iter()
            .map(|k| Plug::new(plug.node, *k))
            .collect())
    }

    fn plug_value(&self, plug: Plug) -> SceneResult<PlugValue> {
        let attr = self.attr(plug)?;
        if let Some(index) = plug.index {
            return attr
                .elements
                .get(&index)
                .or(attr.value.as_ref())
                .cloned()
                .ok_or_else(|| {
                    SceneError::TypeMismatch(format!("'{}' holds no value", attr.long_name))
                });
        }
        if attr.holds_elements() {
            return Ok(PlugValue::Compound(attr.elements.values().cloned().collect()));
        }
        if !attr.children.is_empty() {
            let values = attr
                .children
                .iter()
                .map(|k| self.plug_value(Plug::new(plug.node, *k)))
                .collect::<SceneResult<Vec<_>>>()?;
            return Ok(Self::join_children(attr.data_type, values));
        }
        attr.value.clone().ok_or_else(|| {
            SceneError::TypeMismatch(format!("'{}' holds no value", attr.long_name))
        })
    }

    fn set_plug_value(&mut self, plug: Plug, value: PlugValue) -> SceneResult<PlugValue> {
        let attr = self.attr(plug)?;
        if let Some(index) = plug.index {
            self.check_leaf(plug, &value)?;
            let attr = self.attr_mut(plug)?;
            let old = attr.elements.insert(index, value).or_else(|| attr.value.clone());
            return old.ok_or_else(|| SceneError::TypeMismatch("element held no value".into()));
        }
        if attr.holds_elements() {
            return Err(SceneError::TypeMismatch(format!(
                "'{}' is an array; write one of its elements",
                attr.long_name
            )));
        }
        if attr.children.is_empty() {
            self.check_leaf(plug, &value)?;
            let attr = self.attr_mut(plug)?;
            let old = attr.value.replace(value);
            return old.ok_or_else(|| SceneError::TypeMismatch("plug held no value".into()));
        }

        if attr.locked {
            return Err(SceneError::Locked(self.plug_name(plug)?));
        }
        let children = attr.children.clone();
        let parts = value
            .split()
            .filter(|parts| parts.len() == children.len())
            .ok_or_else(|| {
                SceneError::TypeMismatch(format!(
                    "'{}' has {} children, got {}",
                    attr.long_name,
                    children.len(),
                    value.type_name()
                ))
            })?;
        for (child, part) in children.iter().zip(&parts) {
            let child = Plug::new(plug.node, *child);
            if self.attr(child)?.children.is_empty() {
                self.check_leaf(child, part)?;
            }
        }
        let old = self.plug_value(plug)?;
        for (child, part) in children.into_iter().zip(parts) {
            self.set_plug_value(Plug::new(plug.node, child), part)?;
        }
        Ok(old)
    }

    fn plug_flag(&self, plug: Plug, flag: PlugFlag) -> SceneResult<bool> {
        let attr = self.attr(plug)?;
        Ok(match flag {
            PlugFlag::Keyable => attr.keyable,
            PlugFlag::Locked => attr.locked,
            PlugFlag::ChannelBox => attr.channel_box,
        })
    }

    fn set_plug_flag(&mut self, plug: Plug, flag: PlugFlag, value: bool) -> SceneResult<bool> {
        let attr = self.attr_mut(plug)?;
        let field = match flag {
            PlugFlag::Keyable => &mut attr.keyable,
            PlugFlag::Locked => &mut attr.locked,
            PlugFlag::ChannelBox => &mut attr.channel_box,
        };
        Ok(std::mem::replace(field, value))
    }

    fn connect(&mut self, source: Plug, destination: Plug) -> SceneResult {
        if source == destination {
            return Err(SceneError::InvalidHandle("cannot connect a plug to itself".into()));
        }
        let src = self.attr(source)?;
        let dst = self.attr(destination)?;
        if dst.locked {
            return Err(SceneError::Locked(self.plug_name(destination)?));
        }
        let message = |a: &AttrSlot| a.category == AttrCategory::Message;
        let arity = |a: &AttrSlot| a.data_type.map(DataType::arity);
        if message(src) != message(dst)
            || arity(src) != arity(dst)
            || src.children.len() != dst.children.len()
        {
            return Err(SceneError::TypeMismatch(format!(
                "cannot connect '{}' to '{}'",
                self.plug_name(source)?,
                self.plug_name(destination)?
            )));
        }
        if self.source(destination)?.is_some() {
            return Err(SceneError::AlreadyConnected(self.plug_name(destination)?));
        }
        self.connections.push((source, destination));
        Ok(())
    }

    fn disconnect(&mut self, source: Plug, destination: Plug) -> SceneResult {
        let index = self
            .connections
            .iter()
            .position(|c| *c == (source, destination))
            .ok_or_else(|| SceneError::NotConnected {
                from: self.plug_name(source).unwrap_or_else(|_| format!("{source:?}")),
                to: self
                    .plug_name(destination)
                    .unwrap_or_else(|_| format!("{destination:?}")),
            })?;
        self.connections.remove(index);
        Ok(())
    }

    fn source(&self, plug: Plug) -> SceneResult<Option<Plug>> {
        self.attr(plug)?;
        Ok(self
            .connections
            .iter()
            .find(|(_, dst)| *dst == plug)
            .map(|(src, _)| *src))
    }

    fn destinations(&self, plug: Plug) -> SceneResult<Vec<Plug>> {
        self.attr(plug)?;
        Ok(self
            .connections
            .iter()
            .filter(|(src, _)| *src == plug)
            .map(|(_, dst)| *dst)
            .collect())
    }

    fn set_members(&self, set: NodeId) -> SceneResult<Vec<ObjectHandle>> {
        let slot = self.slot(set)?;
        if !slot.functions.contains(FnSet::SET) {
            return Err(SceneError::TypeMismatch(format!(
                "'{}' is not an object set",
                slot.name
            )));
        }
        Ok(slot
            .members
            .iter()
            .filter(|member| self.handle_alive(member))
            .copied()
            .collect())
    }

    fn add_set_member(&mut self, set: NodeId, member: ObjectHandle) -> SceneResult<bool> {
        if member == ObjectHandle::Node(set) {
            return Err(SceneError::InvalidHandle("a set cannot contain itself".into()));
        }
        if !self.handle_alive(&member) {
            return Err(SceneError::NotFound(format!("{member:?}")));
        }
        let slot = self.set_slot_mut(set)?;
        if slot.members.contains(&member) {
            return Ok(false);
        }
        slot.members.push(member);
        Ok(true)
    }

    fn remove_set_member(&mut self, set: NodeId, member: ObjectHandle) -> SceneResult<bool> {
        let slot = self.set_slot_mut(set)?;
        match slot.members.iter().position(|m| *m == member) {
            Some(position) => {
                slot.members.remove(position);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
