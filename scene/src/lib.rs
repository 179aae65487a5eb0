//! # Plugwork Scene
//!
//! The narrow interface the command engine consumes from a scene graph, and an
//! in-memory implementation of it.
//!
//! - [`SceneGraph`]: name resolution, classification and mutation primitives
//! - [`MemoryScene`]: reference scene with unique names and restorable nodes
//! - [`AttributeObject`]: a detached attribute ready to be attached
//! - handles ([`NodeId`], [`Plug`], [`ObjectHandle`], [`DagPath`], [`RawHandle`])
//! - values ([`PlugValue`], [`StringData`]) and types ([`DataType`],
//!   [`AttrCategory`], [`FnSet`])

mod attribute;
mod error;
mod graph;
mod handle;
mod memory;
mod types;
mod value;

pub use attribute::{AttributeFlags, AttributeInfo, AttributeObject};
pub use error::{SceneError, SceneResult};
pub use graph::{PlugFlag, SceneGraph};
pub use handle::{
    AttrKey, ComponentId, ComponentKind, DagPath, NameTarget, NodeId, ObjectHandle, Plug,
    RawHandle,
};
pub use memory::{MemoryScene, node_type_names};
pub use types::{AttrCategory, DataType, FnSet};
pub use value::{PlugValue, StringData};
