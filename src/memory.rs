use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};

/// Physical memory: a fixed byte buffer plus a per-byte allocation bitmap.
///
/// `allocated[i]` is true iff byte `i` holds resident page data. Allocation
/// is tracked per byte so partially filled pages stay visible to
/// [`PhysicalMemory::is_fragmented`].
pub struct PhysicalMemory {
    config: MemoryConfig,
    data: Box<[u8]>,
    allocated: Box<[bool]>,
}

/// Outcome of a fragmentation scan, recomputed on every call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentationReport {
    pub fragmented: bool,
    /// Partially allocated pages, in ascending order
    pub pages: Vec<usize>,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros, nothing allocated
    pub fn new(config: MemoryConfig) -> Self {
        let size = config.physical_size();
        PhysicalMemory {
            config,
            data: vec![0u8; size].into_boxed_slice(),
            allocated: vec![false; size].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Read a byte from physical memory
    pub fn read(&self, address: usize) -> MemoryResult<u8> {
        self.data.get(address).copied().ok_or_else(|| self.page_out_of_range(address))
    }

    /// Copy `bytes` into physical memory starting at `address`.
    ///
    /// Only the contents change; the allocation bitmap is left alone.
    pub fn write(&mut self, address: usize, bytes: &[u8]) -> MemoryResult<()> {
        let end = address
            .checked_add(bytes.len())
            .filter(|&end| end <= self.size())
            .ok_or_else(|| self.page_out_of_range(address.saturating_add(bytes.len())))?;
        self.data[address..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Whether byte `address` is marked allocated; out-of-range bytes never are
    #[inline]
    pub fn is_allocated(&self, address: usize) -> bool {
        self.allocated.get(address).copied().unwrap_or(false)
    }

    /// A page counts as allocated when its first byte is.
    pub fn is_page_allocated(&self, page: usize) -> bool {
        page < self.config.page_count() && self.allocated[self.config.page_base(page)]
    }

    /// Number of allocated bytes inside `page`
    pub fn allocated_bytes(&self, page: usize) -> MemoryResult<usize> {
        let range = self.page_range(page)?;
        Ok(self.allocated[range].iter().filter(|&&a| a).count())
    }

    /// Borrow the bytes of one page
    pub fn page(&self, page: usize) -> MemoryResult<&[u8]> {
        let range = self.page_range(page)?;
        Ok(&self.data[range])
    }

    /// Install `data` at the start of `page` and mark exactly `data.len()`
    /// bytes allocated.
    ///
    /// Fails before touching anything if the page is out of range or the
    /// payload is larger than a page.
    pub fn allocate(&mut self, page: usize, data: &[u8]) -> MemoryResult<()> {
        let range = self.page_range(page)?;
        let page_size = self.config.page_size();
        if data.len() > page_size {
            return Err(MemoryError::SizeMismatch {
                page,
                offset: 0,
                len: data.len(),
                available: page_size,
            });
        }

        let start = range.start;
        let end = start + data.len();
        self.data[start..end].copy_from_slice(data);
        self.allocated[start..end].fill(true);
        Ok(())
    }

    /// Clear the allocation bits of the whole page.
    ///
    /// The bytes themselves are left in place and are stale until the page
    /// is allocated again. Deallocating a free page is a no-op.
    pub fn deallocate(&mut self, page: usize) -> MemoryResult<()> {
        let range = self.page_range(page)?;
        self.allocated[range].fill(false);
        Ok(())
    }

    /// Scan the bitmap page by page for partially allocated pages.
    pub fn is_fragmented(&self) -> FragmentationReport {
        let page_size = self.config.page_size();
        let pages: Vec<usize> = self
            .allocated
            .chunks_exact(page_size)
            .enumerate()
            .filter(|(_, bits)| {
                let any = bits.iter().any(|&a| a);
                let all = bits.iter().all(|&a| a);
                any && !all
            })
            .map(|(page, _)| page)
            .collect();

        FragmentationReport {
            fragmented: !pages.is_empty(),
            pages,
        }
    }

    fn page_range(&self, page: usize) -> MemoryResult<std::ops::Range<usize>> {
        let pages = self.config.page_count();
        if page >= pages {
            return Err(MemoryError::PageOutOfRange { page, pages });
        }
        let start = self.config.page_base(page);
        Ok(start..start + self.config.page_size())
    }

    fn page_out_of_range(&self, address: usize) -> MemoryError {
        MemoryError::PageOutOfRange {
            page: address / self.config.page_size(),
            pages: self.config.page_count(),
        }
    }
}
