//! Memory-management unit: address translation, demand swap-in and
//! caller-driven swap-out.
//!
//! Virtual page `n` is backed by physical page `n` and swap page `n`. Every
//! page starts out Swapped (zero-filled in the backing store) and becomes
//! Resident on its first access.

use std::fmt;

use log::{debug, trace, warn};

use crate::config::MemoryConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::memory::PhysicalMemory;
use crate::swap::BackingStore;

/// Where a page's current data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Resident,
    Swapped,
}

/// Whether a read was served directly or had to fault the page in first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    Memory,
    Swap,
}

/// One entry of the access log, in call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessEvent {
    Read {
        address: usize,
        page: usize,
        source: ReadSource,
    },
    Allocate {
        page: usize,
    },
    Write {
        address: usize,
        page: usize,
        len: usize,
    },
    SwapIn {
        page: usize,
    },
    SwapOut {
        page: usize,
    },
}

impl fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            AccessEvent::Read { address, page, source } => {
                let place = match source {
                    ReadSource::Memory => "in memory",
                    ReadSource::Swap => "from swap",
                };
                write!(f, "Read virtual address {}: Physical page {} ({})", address, page, place)
            }
            AccessEvent::Allocate { page } => write!(f, "Allocate virtual page {}", page),
            AccessEvent::Write { address, page, len } => write!(
                f,
                "Write virtual address {}: Physical page {} ({} bytes)",
                address, page, len
            ),
            AccessEvent::SwapIn { page } => write!(f, "Swap in virtual page {}", page),
            AccessEvent::SwapOut { page } => write!(f, "Swap out virtual page {}", page),
        }
    }
}

/// The MMU owns physical memory, the backing store and the access log.
pub struct Mmu<B: BackingStore> {
    config: MemoryConfig,
    memory: PhysicalMemory,
    swap: B,
    access_log: Vec<AccessEvent>,
}

impl<B: BackingStore> Mmu<B> {
    /// Pair a physical memory with a backing store of the same geometry.
    pub fn new(memory: PhysicalMemory, swap: B) -> MemoryResult<Self> {
        let config = *memory.config();
        if swap.page_size() != config.page_size() || swap.page_count() < config.page_count() {
            return Err(MemoryError::InvalidConfig(format!(
                "backing store ({} pages of {} bytes) does not cover physical memory ({} pages of {} bytes)",
                swap.page_count(),
                swap.page_size(),
                config.page_count(),
                config.page_size()
            )));
        }

        Ok(Mmu {
            config,
            memory,
            swap,
            access_log: Vec::new(),
        })
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn swap(&self) -> &B {
        &self.swap
    }

    pub fn access_log(&self) -> &[AccessEvent] {
        &self.access_log
    }

    /// Give back the owned stores, e.g. to delete the swap file.
    pub fn into_parts(self) -> (PhysicalMemory, B, Vec<AccessEvent>) {
        (self.memory, self.swap, self.access_log)
    }

    pub fn page_state(&self, page: usize) -> MemoryResult<PageState> {
        self.check_page(page)?;
        Ok(self.state_of(page))
    }

    /// Resident virtual pages, ascending
    pub fn resident_pages(&self) -> Vec<usize> {
        (0..self.config.virtual_page_count())
            .filter(|&page| self.memory.is_page_allocated(page))
            .collect()
    }

    /// Read one byte, faulting its page in if needed.
    pub fn read(&mut self, address: usize) -> MemoryResult<u8> {
        let va = self.config.translate(address)?;

        let source = match self.state_of(va.page) {
            PageState::Resident => ReadSource::Memory,
            PageState::Swapped => {
                debug!("page fault on read of {}", va);
                self.swap_in(va.page)?;
                ReadSource::Swap
            }
        };

        let value = self.memory.read(self.config.page_base(va.page) + va.offset)?;
        trace!("read {:#04x} from {}", value, va);
        self.access_log.push(AccessEvent::Read {
            address,
            page: va.page,
            source,
        });
        Ok(value)
    }

    /// Write `data` starting at `address`, faulting its page in if needed.
    ///
    /// The payload must fit between the offset and the end of the page;
    /// otherwise the call fails with `SizeMismatch` before anything changes.
    pub fn write(&mut self, address: usize, data: &[u8]) -> MemoryResult<()> {
        let va = self.config.translate(address)?;
        let available = va.remaining(self.config.page_size());
        if data.len() > available {
            return Err(MemoryError::SizeMismatch {
                page: va.page,
                offset: va.offset,
                len: data.len(),
                available,
            });
        }

        if self.state_of(va.page) == PageState::Swapped {
            debug!("page fault on write of {}", va);
            self.swap_in(va.page)?;
            self.access_log.push(AccessEvent::Allocate { page: va.page });
        }

        self.memory.write(self.config.page_base(va.page) + va.offset, data)?;
        trace!("wrote {} bytes at {}", data.len(), va);
        self.access_log.push(AccessEvent::Write {
            address,
            page: va.page,
            len: data.len(),
        });
        Ok(())
    }

    /// Load a page from the backing store into physical memory.
    ///
    /// A page that is already resident is left alone, so unsaved writes are
    /// never replaced by the older swap copy.
    pub fn swap_in(&mut self, page: usize) -> MemoryResult<()> {
        self.check_page(page)?;
        if self.state_of(page) == PageState::Resident {
            debug!("page {} already resident, skipping swap-in", page);
            return Ok(());
        }

        let data = self.swap.read_page(page)?;
        self.memory.allocate(page, &data)?;
        debug!("swapped in page {}", page);
        self.access_log.push(AccessEvent::SwapIn { page });
        Ok(())
    }

    /// Save a resident page to the backing store and free it.
    ///
    /// Swapping out a page that is not resident does nothing: its swap copy
    /// is already the latest data.
    pub fn swap_out(&mut self, page: usize) -> MemoryResult<()> {
        self.check_page(page)?;
        if self.state_of(page) == PageState::Swapped {
            warn!("page {} is not resident, ignoring swap-out", page);
            return Ok(());
        }

        let data = self.memory.page(page)?.to_vec();
        self.swap.write_page(page, &data)?;
        self.memory.deallocate(page)?;
        debug!("swapped out page {}", page);
        self.access_log.push(AccessEvent::SwapOut { page });
        Ok(())
    }

    fn state_of(&self, page: usize) -> PageState {
        if self.memory.is_page_allocated(page) {
            PageState::Resident
        } else {
            PageState::Swapped
        }
    }

    fn check_page(&self, page: usize) -> MemoryResult<()> {
        let pages = self.config.virtual_page_count();
        if page >= pages {
            return Err(MemoryError::PageOutOfRange { page, pages });
        }
        Ok(())
    }
}
