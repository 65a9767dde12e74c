use std::{error, fmt};

/// Errors raised while scheduling and running block transforms.
///
/// Every variant is fatal to a run: the scheduler never retries and never
/// salvages partial results, so a spectrum buffer touched by a failed run
/// must not be consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Block size, scratch sizing or worker count is unusable.
    InvalidConfiguration {
        /// Explaining why the configuration was rejected.
        reason: String,
    },
    /// A block descriptor would read past the end of the sample buffer.
    OutOfRange {
        /// First sample index of the offending block.
        offset: usize,
        /// Length of the offending block.
        len: usize,
        /// Total number of samples in the buffer.
        total: usize,
    },
    /// The sample source could not resolve or decode its input.
    SourceUnavailable {
        /// The identifier handed to the source.
        source: String,
        /// What went wrong while resolving it.
        reason: String,
    },
    /// The FFT kernel rejected a transform request.
    KernelFailure {
        /// Why the kernel could not run.
        reason: String,
    },
}

impl Error {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn kernel(reason: impl Into<String>) -> Self {
        Error::KernelFailure {
            reason: reason.into(),
        }
    }

    pub(crate) fn source_unavailable(source: &str, reason: impl fmt::Display) -> Self {
        Error::SourceUnavailable {
            source: source.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfiguration { reason } => {
                write!(f, "Invalid configuration: {reason}")
            }
            Error::OutOfRange { offset, len, total } => write!(
                f,
                "Block [{offset}, {}) exceeds the {total} available samples",
                offset + len
            ),
            Error::SourceUnavailable { source, reason } => {
                write!(f, "Sample source `{source}` unavailable: {reason}")
            }
            Error::KernelFailure { reason } => write!(f, "FFT kernel failure: {reason}"),
        }
    }
}

impl error::Error for Error {}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
