//! # Plugwork
//!
//! Undoable editing of a live scene graph.
//!
//! - [`Modifier`] batches node, connection, value and attribute mutations and
//!   commits them as one unit that rolls back as one unit
//! - [`AttributeDescriptor`] validates an attribute request and
//!   [`AttributeBuilder`] turns it into a detached attribute object
//! - [`StagingBuffer`] holds compounds until their last child arrives
//! - [`ObjectRegistry`] wraps names and raw handles as [`Node`],
//!   [`Attribute`] or [`Component`]
//! - [`SceneContext`] owns the scene, the [`UndoLedger`] and the registry
//!
//! The scene itself is anything implementing
//! [`SceneGraph`](plugwork_scene::SceneGraph);
//! [`MemoryScene`](plugwork_scene::MemoryScene) is the in-memory backend.

pub mod attribute;
pub mod config;
mod context;
mod error;
pub mod factory;
pub mod modifier;
pub mod objects;

pub use attribute::{
    AttributeBuilder, AttributeDescriptor, DescriptorBuilder, DescriptorError, StagingBuffer,
    StagingError,
};
pub use config::{ConfigError, EngineConfig, load_config, load_or_default};
pub use context::SceneContext;
pub use error::{EngineError, EngineResult};
pub use factory::{FactoryError, FactoryInput, ObjectKind, ObjectRegistry};
pub use modifier::{CommitPolicy, Modifier, ModifierError, ModifierState, NodeRef, PlugRef};
pub use objects::{Attribute, Component, Node, SceneObject};

pub use plugwork_core::{
    CompoundOperation, FailurePolicy, Operation, OperationError, ProxyOperation, UndoLedger,
    UndoOrder,
};
