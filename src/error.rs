use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the fingerprinting pipeline.
///
/// Index errors are passthrough: whatever the backing store reports is
/// carried as the source, untouched. The matcher never errors on
/// "no match"; that is an empty result list.
#[derive(Debug, Error)]
pub enum Error {
    #[error("input of {got} samples is shorter than one analysis window of {need}")]
    InputTooShort { got: usize, need: usize },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("index read failed")]
    IndexRead(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("index write failed")]
    IndexWrite(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to decode audio from {path}")]
    Decode {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    pub(crate) fn index_read<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::IndexRead(Box::new(source))
    }

    pub(crate) fn index_write<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::IndexWrite(Box::new(source))
    }
}
