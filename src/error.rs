//! Error types shared by every component of the memory system.

use std::io;

use thiserror::Error;

/// Errors returned by the physical memory, swap store and MMU.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("virtual address {address:#x} is outside the {limit}-byte virtual space")]
    AddressOutOfRange { address: usize, limit: usize },

    #[error("page {page} is outside the {pages}-page store")]
    PageOutOfRange { page: usize, pages: usize },

    #[error(
        "{len}-byte payload at offset {offset} does not fit in page {page} ({available} bytes left)"
    )]
    SizeMismatch {
        page: usize,
        offset: usize,
        len: usize,
        available: usize,
    },

    #[error("swap backing store {op} failed at offset {offset:#x}: {source}")]
    BackingStore {
        op: &'static str,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("invalid memory configuration: {0}")]
    InvalidConfig(String),
}

impl MemoryError {
    /// True for both address and page bound violations.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            MemoryError::AddressOutOfRange { .. } | MemoryError::PageOutOfRange { .. }
        )
    }

    pub(crate) fn backing(op: &'static str, offset: u64) -> impl FnOnce(io::Error) -> Self {
        move |source| MemoryError::BackingStore { op, offset, source }
    }
}

/// Result alias for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;
