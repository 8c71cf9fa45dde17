use crate::value::ValueKind;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("attempt to index a {found} value")]
    NotATable { found: ValueKind },

    #[error("attempt to call a {found} value")]
    NotCallable { found: ValueKind },

    #[error("module '{name}' not found")]
    UnknownModule { name: String },

    #[error("table #{id} does not belong to this host")]
    UnknownTable { id: u64 },

    #[error("function #{id} does not belong to this host")]
    UnknownFunction { id: u64 },

    #[error("invalid table key of kind {found}")]
    InvalidKey { found: ValueKind },

    #[error("bad argument #{position} to '{function}': {message}")]
    BadArgument {
        function: String,
        position: usize,
        message: String,
    },

    /// An error raised by native code running inside a host call.
    #[error(transparent)]
    Native(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("invalid graph fixture: {message}")]
    Fixture { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
