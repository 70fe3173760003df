use thiserror::Error;

/// Boxed error produced by a fallible setup callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the tenant options pipeline.
///
/// Removing an absent name is never an error: those operations return `false`.
#[derive(Error, Debug)]
pub enum Error {
    /// A required callback or collaborator was not supplied.
    #[error("invalid argument: `{0}` is required")]
    InvalidArgument(&'static str),

    /// The operation has no meaning without a tenant.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// One or more validators rejected the built value.
    #[error("validation failed for options `{name}`: {}", failures.join("; "))]
    Validation { name: String, failures: Vec<String> },

    /// A setup callback failed while building the value.
    #[error("failed to configure options `{name}`")]
    Configure {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    /// Returns true for [`Error::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
