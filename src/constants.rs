pub const KIB: usize = 1024;

pub const PAGE_SIZE: usize = 4 * KIB;
pub const VIRTUAL_MEMORY_SIZE: usize = 100 * KIB;
pub const PHYSICAL_MEMORY_SIZE: usize = 1024 * KIB;

pub const VIRTUAL_PAGES: usize = VIRTUAL_MEMORY_SIZE / PAGE_SIZE;
pub const PHYSICAL_PAGES: usize = PHYSICAL_MEMORY_SIZE / PAGE_SIZE;

pub const SWAP_BACKING_PATH: &str = "swap_memory.bin";
