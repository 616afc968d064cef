use crate::constants::*;
use crate::error::{MemoryError, MemoryResult};
use crate::translation::VirtualAddress;

/// Sizes shared by every component of one memory system.
///
/// Built once and handed to each constructor, so independent systems with
/// different geometries can live side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryConfig {
    virtual_size: usize,
    physical_size: usize,
    page_size: usize,
}

impl MemoryConfig {
    /// Validate and build a configuration.
    ///
    /// The page size must be a power of two dividing both memory sizes, and
    /// the virtual space may not exceed physical memory: virtual page `n` is
    /// backed by physical page `n` and swap page `n`.
    pub fn new(virtual_size: usize, physical_size: usize, page_size: usize) -> MemoryResult<Self> {
        if virtual_size == 0 || physical_size == 0 || page_size == 0 {
            return Err(MemoryError::InvalidConfig(format!(
                "sizes must be positive (virtual={}, physical={}, page={})",
                virtual_size, physical_size, page_size
            )));
        }
        if !page_size.is_power_of_two() {
            return Err(MemoryError::InvalidConfig(format!(
                "page size {} is not a power of two",
                page_size
            )));
        }
        if virtual_size % page_size != 0 || physical_size % page_size != 0 {
            return Err(MemoryError::InvalidConfig(format!(
                "page size {} does not divide virtual size {} and physical size {}",
                page_size, virtual_size, physical_size
            )));
        }
        if virtual_size > physical_size {
            return Err(MemoryError::InvalidConfig(format!(
                "virtual size {} exceeds physical size {}",
                virtual_size, physical_size
            )));
        }

        Ok(MemoryConfig { virtual_size, physical_size, page_size })
    }

    #[inline]
    pub fn virtual_size(&self) -> usize {
        self.virtual_size
    }

    #[inline]
    pub fn physical_size(&self) -> usize {
        self.physical_size
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages in physical memory (and in the swap store)
    #[inline]
    pub fn page_count(&self) -> usize {
        self.physical_size / self.page_size
    }

    /// Number of pages addressable from the virtual space
    #[inline]
    pub fn virtual_page_count(&self) -> usize {
        self.virtual_size / self.page_size
    }

    /// Byte offset of the first byte of `page`
    #[inline]
    pub fn page_base(&self, page: usize) -> usize {
        page * self.page_size
    }

    /// Decompose a virtual address, rejecting anything outside the virtual space.
    pub fn translate(&self, address: usize) -> MemoryResult<VirtualAddress> {
        if address >= self.virtual_size {
            return Err(MemoryError::AddressOutOfRange {
                address,
                limit: self.virtual_size,
            });
        }
        Ok(VirtualAddress::from_raw(address, self.page_size))
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        MemoryConfig {
            virtual_size: VIRTUAL_MEMORY_SIZE,
            physical_size: PHYSICAL_MEMORY_SIZE,
            page_size: PAGE_SIZE,
        }
    }
}
