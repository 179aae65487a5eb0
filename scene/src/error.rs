use crate::handle::NodeId;

/// Errors raised by a scene graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// Nothing matched a name or handle.
    #[error("not found: {0}")]
    NotFound(String),
    /// A name matched more than one object.
    #[error("not unique: {0}")]
    NotUnique(String),
    /// The handle refers to a node that no longer exists.
    #[error("{0} is not alive")]
    DeadNode(NodeId),
    /// The handle cannot be used for this request.
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),
    /// An attribute with this long or short name already exists.
    #[error("'{node}' already has an attribute named '{name}'")]
    DuplicateName { node: String, name: String },
    /// A value or attribute of the wrong kind was supplied.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
    /// The node or plug is locked against edits.
    #[error("'{0}' is locked")]
    Locked(String),
    #[error("'{0}' already has an incoming connection")]
    AlreadyConnected(String),
    #[error("'{from}' is not connected to '{to}'")]
    NotConnected { from: String, to: String },
    /// Compound attributes must carry at least one child when attached.
    #[error("compound '{0}' has no children")]
    EmptyCompound(String),
    #[error("invalid parent: {0}")]
    InvalidParent(String),
}

/// Result type for scene calls.
pub type SceneResult<T = ()> = Result<T, SceneError>;
