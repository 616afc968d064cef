/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: usize,
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Decompose a raw VA into `(page, offset)` for a power-of-two page size.
    ///
    /// Equivalent to `divmod(va, page_size)`; no range check is done here,
    /// see [`MemoryConfig::translate`](crate::config::MemoryConfig::translate).
    pub fn from_raw(va: usize, page_size: usize) -> Self {
        debug_assert!(page_size.is_power_of_two());
        let shift = page_size.trailing_zeros();
        let page = va >> shift;
        let offset = va & (page_size - 1);

        VirtualAddress { va, page, offset }
    }

    /// Rebuild the raw address from its components
    #[inline]
    pub fn to_raw(&self, page_size: usize) -> usize {
        self.page * page_size + self.offset
    }

    /// Bytes left in the page from `offset` onward
    #[inline]
    pub fn remaining(&self, page_size: usize) -> usize {
        page_size - self.offset
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VA({}) = (page={}, offset={})", self.va, self.page, self.offset)
    }
}
