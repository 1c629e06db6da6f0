use super::{PAGE_SIZE, PageId};

/// A fixed-size page image carrying the page number that identifies its
/// slot in the owning file
#[derive(Debug, Clone)]
pub struct Page {
    number: PageId,
    data: Vec<u8>,
}

impl Page {
    /// Create a zeroed page for the given page number
    pub fn new(number: PageId) -> Self {
        Self {
            number,
            data: vec![0u8; PAGE_SIZE],
        }
    }

    /// The page number embedded in this page
    pub fn number(&self) -> PageId {
        self.number
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_page_is_zeroed() {
        let page = Page::new(7);
        assert_eq!(page.number(), 7);
        assert_eq!(page.data().len(), PAGE_SIZE);
        assert!(page.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_data_mut_is_visible_through_data() {
        let mut page = Page::new(0);
        page.data_mut()[0] = 42;
        page.data_mut()[PAGE_SIZE - 1] = 255;
        assert_eq!(page.data()[0], 42);
        assert_eq!(page.data()[PAGE_SIZE - 1], 255);
    }
}
