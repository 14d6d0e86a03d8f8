//! Structured error types for wirescope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Every error maps onto a shared [`ErrorKind`] so callers can decide whether
//! to drop a single delivery, retry against another binary, or surface it.
//!
//! Suppression is not an error: a rate-limited metric is
//! [`crate::correlation::MetricCheck::Suppressed`] and a non-loggable event
//! renders to `Ok(None)`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy shared by every component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    Internal,
    Unimplemented,
    AlreadyExists,
}

impl ErrorKind {
    /// Kind of the first typed error in `err`'s cause chain
    ///
    /// A bare [`io::Error`] of kind `NotFound` counts as
    /// [`ErrorKind::NotFound`]; anything untyped yields `None`.
    #[must_use]
    pub fn of(err: &anyhow::Error) -> Option<ErrorKind> {
        err.chain().find_map(|cause| {
            if let Some(e) = cause.downcast_ref::<ElfError>() {
                Some(e.kind())
            } else if let Some(e) = cause.downcast_ref::<ExportError>() {
                Some(e.kind())
            } else if let Some(e) = cause.downcast_ref::<StoreError>() {
                Some(e.kind())
            } else if let Some(e) = cause.downcast_ref::<DecodeError>() {
                Some(e.kind())
            } else {
                cause
                    .downcast_ref::<io::Error>()
                    .filter(|e| e.kind() == io::ErrorKind::NotFound)
                    .map(|_| ErrorKind::NotFound)
            }
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Buffer too short: need {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("Invalid ip address family {0}")]
    InvalidAddressFamily(u16),

    #[error("Event category {0} not known")]
    UnknownCategory(u32),

    #[error("Unknown event type {event_type} for category {category}")]
    UnknownEventType { category: u32, event_type: u32 },
}

impl DecodeError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::Truncated { .. } | DecodeError::InvalidAddressFamily(_) => {
                ErrorKind::Internal
            }
            DecodeError::UnknownCategory(_) | DecodeError::UnknownEventType { .. } => {
                ErrorKind::Unimplemented
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No entry for key {key} under metric {metric}")]
    NotFound { metric: String, key: String },

    #[error("Collection not started for metric {0}")]
    CollectionNotStarted(String),
}

impl StoreError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::CollectionNotStarted(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("{0} already registered")]
    AlreadyRegistered(String),

    #[error("{0} not registered")]
    NotRegistered(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("Failed to write to sink: {0}")]
    Io(#[from] io::Error),
}

impl ExportError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::AlreadyRegistered(_) => ErrorKind::AlreadyExists,
            ExportError::NotRegistered(_) => ErrorKind::NotFound,
            ExportError::Decode(e) => e.kind(),
            ExportError::Io(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Error, Debug)]
pub enum ElfError {
    #[error("Binary path cannot be opened: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Unable to read elf file: {0}")]
    Malformed(String),

    #[error("Unsupported ELF version {0}")]
    UnsupportedVersion(u8),

    #[error("Output buffer is empty")]
    EmptyBuffer,

    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error("Address 0x{addr:x} is below the start of section {section}")]
    AddressOutsideSection { addr: u64, section: String },

    #[error("Failed to seek to offset 0x{offset:x}")]
    Seek {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("Read data seems incorrect: wanted {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Could not find vdso")]
    VdsoNotFound,

    #[error("Unable to read vdso header: {0}")]
    VdsoHeader(String),

    #[error("Could not find version number")]
    VersionNoteNotFound,
}

impl ElfError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ElfError::Open { .. } | ElfError::SectionNotFound(_) => ErrorKind::NotFound,
            ElfError::Malformed(_) | ElfError::UnsupportedVersion(_) => {
                ErrorKind::FailedPrecondition
            }
            ElfError::EmptyBuffer => ErrorKind::InvalidArgument,
            ElfError::AddressOutsideSection { .. }
            | ElfError::Seek { .. }
            | ElfError::ShortRead { .. }
            | ElfError::Io(_)
            | ElfError::VdsoNotFound
            | ElfError::VdsoHeader(_)
            | ElfError::VersionNoteNotFound => ErrorKind::Internal,
        }
    }
}

impl From<object::Error> for ElfError {
    fn from(err: object::Error) -> Self {
        ElfError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_kinds() {
        assert_eq!(DecodeError::InvalidAddressFamily(3).kind(), ErrorKind::Internal);
        assert_eq!(DecodeError::UnknownCategory(9).kind(), ErrorKind::Unimplemented);
        let err = DecodeError::UnknownEventType { category: 1, event_type: 42 };
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_export_error_passes_decode_kind_through() {
        let err = ExportError::from(DecodeError::UnknownCategory(7));
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert_eq!(err.to_string(), "Event category 7 not known");
    }

    #[test]
    fn test_elf_open_error_display() {
        let err = ElfError::Open {
            path: PathBuf::from("/usr/bin/my-app"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/usr/bin/my-app"));
    }

    #[test]
    fn test_kind_of_walks_context_chain() {
        let err = anyhow::Error::new(ExportError::NotRegistered("tcp_rtt".into()))
            .context("Replaying capture");
        assert_eq!(ErrorKind::of(&err), Some(ErrorKind::NotFound));

        let err = anyhow::Error::new(ElfError::UnsupportedVersion(0)).context("Resolving symbols");
        assert_eq!(ErrorKind::of(&err), Some(ErrorKind::FailedPrecondition));

        let missing = anyhow::Error::new(io::Error::from(io::ErrorKind::NotFound))
            .context("Failed to open capture /tmp/none.jsonl");
        assert_eq!(ErrorKind::of(&missing), Some(ErrorKind::NotFound));
    }

    #[test]
    fn test_kind_of_ignores_message_text() {
        let err = anyhow::anyhow!("symbol not found anywhere");
        assert_eq!(ErrorKind::of(&err), None);
        let denied = anyhow::Error::new(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(ErrorKind::of(&denied), None);
    }
}
