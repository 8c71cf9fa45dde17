use gdbridge_host::ValueKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Host(#[from] gdbridge_host::Error),

    #[error("digraph named {name} not found in algorithm class")]
    DigraphNotFound { name: String },

    #[error("{owner} has no '{field}' field")]
    MissingField { owner: String, field: String },

    #[error("{scope} does not exist in the current graph")]
    UnresolvedScope { scope: String },

    #[error("{endpoint} of edge {edge} is not a vertex of the syntactic digraph")]
    UnresolvedVertex { edge: usize, endpoint: &'static str },

    #[error("arc endpoint is not a vertex of digraph {name}")]
    UnknownArcEndpoint { name: String },

    #[error("syntactic edge index not found")]
    SyntacticEdgeNotFound,

    #[error("vertex index {index} is out of range for digraph {name} ({count} vertices)")]
    VertexOutOfRange {
        name: String,
        index: usize,
        count: usize,
    },

    #[error("malformed path: {message}")]
    MalformedPath { message: String },

    #[error("option '{key}' is a {found}, not a {expected}")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("option '{key}' does not hold a registered module factory")]
    UnknownFactory { key: String },

    #[error("factory for '{key}' does not produce a {expected}")]
    FactoryType { key: String, expected: &'static str },

    #[error("different keys used for same module type {type_name}: '{existing}' and '{requested}'")]
    ModuleKeyConflict {
        type_name: &'static str,
        existing: String,
        requested: String,
    },

    #[error("no module registered for {type_name} under '{key}' = '{value}'")]
    UnknownModule {
        type_name: &'static str,
        key: String,
        value: String,
    },

    #[error("declaration of '{key}' is inconsistent: {message}")]
    ConflictingDeclaration { key: String, message: String },

    #[error("invalid bridge configuration: {message}")]
    Config { message: String },

    #[error("algorithm failed: {0}")]
    Algorithm(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps an arbitrary error raised by a layout algorithm.
    pub fn algorithm<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Error::Algorithm(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
