use crate::errors::BreakpointError;

const PAGE_COUNT: usize = 256;
const WORDS_PER_PAGE: usize = 256 / 64;

type Page = [u64; WORDS_PER_PAGE];

/// Set of breakpoint addresses over the 16 bit address space.
///
/// A sparse bitmap: one slot per high address byte, each holding a lazily
/// allocated 256 bit page for the low byte.
pub struct Breakpoints {
    pages: Box<[Option<Box<Page>>; PAGE_COUNT]>,
    count: usize,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Breakpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

const fn locate(address: u16) -> (usize, usize, u64) {
    let [page, offset] = address.to_be_bytes();
    (page as usize, offset as usize / 64, 1 << (offset % 64))
}

impl Breakpoints {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: Box::new([const { None }; PAGE_COUNT]),
            count: 0,
        }
    }

    /// # Errors
    /// - A breakpoint at `address` already exists, nothing changes
    pub fn insert(&mut self, address: u16) -> Result<(), BreakpointError> {
        let (page, word, bit) = locate(address);
        let page = self.pages[page].get_or_insert_with(|| Box::new([0; WORDS_PER_PAGE]));
        if page[word] & bit != 0 {
            return Err(BreakpointError::AlreadySet(address));
        }
        page[word] |= bit;
        self.count += 1;
        Ok(())
    }

    /// # Errors
    /// - There is no breakpoint at `address`, nothing changes
    pub fn remove(&mut self, address: u16) -> Result<(), BreakpointError> {
        let (page, word, bit) = locate(address);
        match self.pages[page].as_deref_mut() {
            Some(page) if page[word] & bit != 0 => {
                page[word] &= !bit;
                self.count -= 1;
                Ok(())
            }
            _ => Err(BreakpointError::NotSet(address)),
        }
    }

    #[must_use]
    pub fn is_set(&self, address: u16) -> bool {
        let (page, word, bit) = locate(address);
        self.pages[page]
            .as_deref()
            .is_some_and(|page| page[word] & bit != 0)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// All breakpoint addresses in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0..=u16::MAX).filter(|&address| self.is_set(address))
    }
}
