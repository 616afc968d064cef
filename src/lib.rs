pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod logging;
pub mod memory;
pub mod mmu;
pub mod swap;
pub mod translation;
pub mod workload;

// Re-export commonly used items for convenience
pub use config::MemoryConfig;
pub use error::{MemoryError, MemoryResult};
pub use memory::{FragmentationReport, PhysicalMemory};
pub use mmu::{AccessEvent, Mmu, PageState, ReadSource};
pub use swap::{BackingStore, MemoryDisk, SwapFile};
pub use translation::VirtualAddress;
