//! Page arithmetic for the time entries list
//!
//! Pages are 1-based. All values derive from the current page, the total
//! item count and the page size.

/// An entry in the page-number strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    /// A selectable page number
    Page(u64),
    /// A gap between non-consecutive page numbers
    Ellipsis,
}

/// Pagination state for a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page, 1-based
    pub current_page: u64,
    /// Total number of items across all pages
    pub total_items: u64,
    /// Items shown per page
    pub per_page: u64,
}

impl Pagination {
    pub fn new(current_page: u64, total_items: u64, per_page: u64) -> Self {
        Self {
            current_page: current_page.max(1),
            total_items,
            per_page: per_page.max(1),
        }
    }

    /// Number of pages needed to show every item
    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(self.per_page)
    }

    /// Offset of the first item of the current page
    pub fn offset(&self) -> u64 {
        (self.current_page - 1) * self.per_page
    }

    /// 1-based index of the first item shown
    pub fn start_item(&self) -> u64 {
        self.offset() + 1
    }

    /// 1-based index of the last item shown
    pub fn end_item(&self) -> u64 {
        (self.current_page * self.per_page).min(self.total_items)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages()
    }

    /// Whether there is anything to paginate
    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    /// "Showing 41 to 45 of 45 results"
    pub fn summary(&self) -> String {
        format!(
            "Showing {} to {} of {} results",
            self.start_item(),
            self.end_item(),
            self.total_items
        )
    }

    /// Page numbers to display: first, last, current and its neighbours
    ///
    /// Gaps between non-consecutive numbers are marked with an ellipsis.
    pub fn page_markers(&self) -> Vec<PageMarker> {
        let total = self.total_pages();
        let current = self.current_page;
        let mut markers = Vec::new();
        let mut previous: Option<u64> = None;

        for page in 1..=total {
            let visible = page == 1 || page == total || page.abs_diff(current) <= 1;
            if !visible {
                continue;
            }
            if let Some(prev) = previous {
                if prev + 1 != page {
                    markers.push(PageMarker::Ellipsis);
                }
            }
            markers.push(PageMarker::Page(page));
            previous = Some(page);
        }

        markers
    }
}
