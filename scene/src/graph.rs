//! The contract a scene graph fulfils for the command engine.

use plugwork_core::Editable;

use crate::attribute::{AttributeInfo, AttributeObject};
use crate::error::{SceneError, SceneResult};
use crate::handle::{DagPath, NameTarget, NodeId, ObjectHandle, Plug};
use crate::types::FnSet;
use crate::value::PlugValue;

/// Boolean state stored per plug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlugFlag {
    Keyable,
    Locked,
    /// Visible in the channel box while not keyable.
    ChannelBox,
}

/// A live scene of typed nodes and attributes.
///
/// Every mutating primitive is synchronous and independently invertible:
/// `create_node` / `remove_node` / `restore_node`, `rename_node` with the
/// old name, `connect` / `disconnect`, `set_plug_value` with the returned old
/// value, `add_attribute` / `remove_attribute` / `restore_attribute`,
/// `rename_attribute` with the returned old name, `add_set_member` /
/// `remove_set_member`.
pub trait SceneGraph: Editable {
    // Resolution and classification

    /// Resolves a unique name to a node, plug or component.
    fn resolve_name(&self, name: &str) -> SceneResult<NameTarget>;

    /// Function sets the object supports.
    fn object_functions(&self, handle: &ObjectHandle) -> SceneResult<FnSet>;

    fn attribute_info(&self, plug: Plug) -> SceneResult<AttributeInfo>;

    fn dag_path(&self, node: NodeId) -> SceneResult<DagPath>;

    fn is_alive(&self, node: NodeId) -> bool;

    // Nodes

    fn node_name(&self, node: NodeId) -> SceneResult<String>;

    fn node_type(&self, node: NodeId) -> SceneResult<String>;

    /// Creates a node. The name is made unique if it is taken; a missing name
    /// is derived from the node type.
    fn create_node(
        &mut self,
        node_type: &str,
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> SceneResult<NodeId>;

    /// Removes a node and its connections, keeping it restorable.
    fn remove_node(&mut self, node: NodeId) -> SceneResult;

    /// Brings back a removed node under the same id.
    fn restore_node(&mut self, node: NodeId) -> SceneResult;

    /// Renames a node and returns the name actually applied.
    fn rename_node(&mut self, node: NodeId, name: &str) -> SceneResult<String>;

    fn is_node_locked(&self, node: NodeId) -> SceneResult<bool>;

    /// Sets the node lock state and returns the previous state.
    fn set_node_locked(&mut self, node: NodeId, locked: bool) -> SceneResult<bool>;

    fn parent(&self, node: NodeId) -> SceneResult<Option<NodeId>>;

    fn children(&self, node: NodeId) -> SceneResult<Vec<NodeId>>;

    // Attributes

    /// Finds an attribute by long or short name.
    fn find_attribute(&self, node: NodeId, name: &str) -> SceneResult<Option<Plug>>;

    /// Top-level attributes of a node in creation order.
    fn attributes(&self, node: NodeId) -> SceneResult<Vec<Plug>>;

    /// Attaches a detached attribute, optionally under an attached compound.
    fn add_attribute(
        &mut self,
        node: NodeId,
        attribute: &AttributeObject,
        parent: Option<&str>,
    ) -> SceneResult<Plug>;

    /// Detaches a dynamic attribute and its children, keeping them
    /// restorable.
    fn remove_attribute(&mut self, plug: Plug) -> SceneResult;

    /// Re-attaches a removed attribute under the same plug.
    fn restore_attribute(&mut self, plug: Plug) -> SceneResult;

    /// Renames a dynamic attribute and returns the name it replaced.
    ///
    /// With `short`, the short name is changed instead of the long one.
    fn rename_attribute(&mut self, plug: Plug, name: &str, short: bool) -> SceneResult<String>;

    /// Logical indices of the elements an array plug holds, ascending.
    ///
    /// An element exists once it was written or connected.
    fn element_indices(&self, plug: Plug) -> SceneResult<Vec<u32>>;

    /// Lowest logical index of an array plug with no incoming connection.
    fn next_available_index(&self, plug: Plug) -> SceneResult<u32> {
        let array = plug.array();
        if !self.attribute_info(array)?.is_array {
            return Err(SceneError::TypeMismatch(format!(
                "'{}' is not an array",
                self.plug_name(array)?
            )));
        }
        let mut index = 0;
        while self.source(array.element(index))?.is_some() {
            index += 1;
        }
        Ok(index)
    }

    fn plug_children(&self, plug: Plug) -> SceneResult<Vec<Plug>>;

    fn plug_value(&self, plug: Plug) -> SceneResult<PlugValue>;

    /// Writes a value and returns the previous one.
    fn set_plug_value(&mut self, plug: Plug, value: PlugValue) -> SceneResult<PlugValue>;

    fn plug_flag(&self, plug: Plug, flag: PlugFlag) -> SceneResult<bool>;

    /// Sets a plug flag and returns its previous state.
    fn set_plug_flag(&mut self, plug: Plug, flag: PlugFlag, value: bool) -> SceneResult<bool>;

    // Connections

    fn connect(&mut self, source: Plug, destination: Plug) -> SceneResult;

    fn disconnect(&mut self, source: Plug, destination: Plug) -> SceneResult;

    /// Incoming connection, if any.
    fn source(&self, plug: Plug) -> SceneResult<Option<Plug>>;

    fn destinations(&self, plug: Plug) -> SceneResult<Vec<Plug>>;

    // Object sets

    /// Live members of an object set, in the order they were added.
    fn set_members(&self, set: NodeId) -> SceneResult<Vec<ObjectHandle>>;

    /// Adds a member and returns whether it was not a member before.
    fn add_set_member(&mut self, set: NodeId, member: ObjectHandle) -> SceneResult<bool>;

    /// Removes a member and returns whether it was one.
    fn remove_set_member(&mut self, set: NodeId, member: ObjectHandle) -> SceneResult<bool>;

    fn is_set_member(&self, set: NodeId, member: &ObjectHandle) -> SceneResult<bool> {
        Ok(self.set_members(set)?.contains(member))
    }

    /// `node.attribute` form of a plug, for messages and logs. Elements get
    /// their index appended, as in `node.targets[2]`.
    fn plug_name(&self, plug: Plug) -> SceneResult<String> {
        let info = self.attribute_info(plug.array())?;
        let node = self.node_name(plug.node)?;
        Ok(match plug.index {
            Some(index) => format!("{node}.{}[{index}]", info.long_name),
            None => format!("{node}.{}", info.long_name),
        })
    }
}
