//! Demonstration workload used by the binary when no trace file is given.

use log::info;

use crate::error::MemoryResult;
use crate::memory::FragmentationReport;
use crate::mmu::Mmu;
use crate::swap::BackingStore;

/// A full page of text: a label followed by `*` padding.
pub fn labelled_block(page: usize, page_size: usize) -> Vec<u8> {
    let mut block = format!("Test file: {} test test test ", page).into_bytes();
    block.resize(page_size, b'*');
    block
}

/// Short label, cut to fit a page
fn stamp(text: String, page_size: usize) -> Vec<u8> {
    let mut bytes = text.into_bytes();
    bytes.truncate(page_size);
    bytes
}

/// Fill every virtual page, stamp and swap each one out, then bring the
/// even pages back with a fresh write.
pub fn run_demo<B: BackingStore>(mmu: &mut Mmu<B>) -> MemoryResult<FragmentationReport> {
    let config = *mmu.config();
    let page_size = config.page_size();
    let pages = config.virtual_page_count();

    for page in 0..pages {
        mmu.write(config.page_base(page), &labelled_block(page, page_size))?;
    }
    info!("wrote {} labelled blocks", pages);

    for page in 0..pages {
        mmu.write(config.page_base(page), &stamp(format!("File {} ", page), page_size))?;
        mmu.swap_out(page)?;
    }

    for page in (0..pages).step_by(2) {
        mmu.write(config.page_base(page), &stamp(format!("Block {}", page), page_size))?;
    }
    info!("{} of {} pages resident", mmu.resident_pages().len(), pages);

    Ok(mmu.memory().is_fragmented())
}
