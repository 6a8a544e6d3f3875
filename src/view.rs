//! Filtered, paginated view over the cached collection

use crate::models::Book;

/// What the list shows: the current page and the number of matches overall
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewSlice {
    pub visible: Vec<Book>,
    pub total: usize,
}

/// Search and paging input, owned by the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub query: String,
    pub page: usize,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            query: String::new(),
            page: 0,
            page_size,
        }
    }

    /// A new query starts again from the first page
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.page = 0;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    /// A new page size starts again from the first page
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
        self.page = 0;
    }

    pub fn page_count(&self, total: usize) -> usize {
        if self.page_size == 0 {
            0
        } else {
            total.div_ceil(self.page_size)
        }
    }

    pub fn derive(&self, books: &[Book]) -> ViewSlice {
        derive_view(books, &self.query, self.page, self.page_size)
    }
}

/// Filter `books` by `query` and cut out page `page` of size `page_size`.
///
/// A book matches when the case-folded query is a substring of its
/// case-folded title or author. Matches keep the collection order. Pages
/// past the end are empty rather than an error.
pub fn derive_view(books: &[Book], query: &str, page: usize, page_size: usize) -> ViewSlice {
    let folded = query.to_lowercase();
    let matching: Vec<&Book> = books.iter().filter(|b| b.matches(&folded)).collect();
    let total = matching.len();

    let visible = match page.checked_mul(page_size) {
        Some(offset) if offset < total => matching
            .into_iter()
            .skip(offset)
            .take(page_size)
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    ViewSlice { visible, total }
}
