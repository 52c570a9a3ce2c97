//! Page request and page envelope primitives for fleet console list views.
//!
//! List screens (vehicles, drivers, users, maintenance records) all page
//! through an already filtered, in-memory collection. This crate keeps the
//! request validation and the envelope shape in one place so every list
//! view reports `total`, `page`, `pageSize`, and `totalPages` the same way.
//!
//! # Examples
//!
//! ```
//! use pagination::{PageRequest, paginate};
//!
//! let request = PageRequest::new(2, 2).expect("valid request");
//! let page = paginate(vec!["a", "b", "c"], request);
//! assert_eq!(page.items(), &["c"]);
//! assert_eq!(page.total(), 3);
//! assert_eq!(page.total_pages(), 2);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of rows shown by list views.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size a list view may request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Validation errors raised when constructing a [`PageRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageRequestError {
    /// Pages are numbered from one.
    #[error("page numbers start at 1")]
    PageZero,
    /// The page size was zero or above [`MAX_PAGE_SIZE`].
    #[error("page size must be between 1 and {max}, got {size}")]
    PageSizeOutOfRange {
        /// Requested page size.
        size: usize,
        /// Upper bound for page sizes.
        max: usize,
    },
}

/// One-based page request for a list view.
///
/// ## Invariants
/// - `page >= 1`.
/// - `1 <= page_size <= MAX_PAGE_SIZE`.
/// Decoding goes through [`PageRequest::new`], so a request read from the
/// wire is validated the same way as one built in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPageRequest")]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

/// Unvalidated wire shape of a [`PageRequest`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageRequest {
    #[serde(default = "first_page")]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

const fn first_page() -> usize {
    1
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = PageRequestError;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(raw.page, raw.page_size)
    }
}

impl PageRequest {
    /// Validate and construct a page request.
    ///
    /// # Errors
    ///
    /// Returns [`PageRequestError`] when the page is zero or the page size
    /// falls outside `1..=MAX_PAGE_SIZE`.
    pub const fn new(page: usize, page_size: usize) -> Result<Self, PageRequestError> {
        if page == 0 {
            return Err(PageRequestError::PageZero);
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PageRequestError::PageSizeOutOfRange {
                size: page_size,
                max: MAX_PAGE_SIZE,
            });
        }
        Ok(Self { page, page_size })
    }

    /// First page using [`DEFAULT_PAGE_SIZE`].
    #[must_use]
    pub const fn first() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Number of rows per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of rows skipped before this page starts.
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Sort direction selected by a list view column header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest value first.
    #[default]
    Asc,
    /// Largest value first.
    Desc,
}

impl SortDirection {
    /// Apply the direction to an ascending comparison result.
    ///
    /// ```
    /// use std::cmp::Ordering;
    /// use pagination::SortDirection;
    ///
    /// assert_eq!(SortDirection::Desc.apply(Ordering::Less), Ordering::Greater);
    /// ```
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }

    /// Opposite direction, used when a column header is clicked twice.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// One page of a list view together with the totals a pager needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    total: usize,
    page: usize,
    page_size: usize,
    total_pages: usize,
}

impl<T> Page<T> {
    /// Rows on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Consume the page and return its rows.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// Number of rows across all pages.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// One-based page number this page was built for.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Requested rows per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages needed to show `total` rows.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Whether a later page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Whether an earlier page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Slice `items` according to `request`.
///
/// Requests past the last page return no rows but still report the total,
/// so a pager can jump back to a valid page.
#[must_use]
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len();
    let page_items = items
        .into_iter()
        .skip(request.offset())
        .take(request.page_size())
        .collect();
    Page {
        items: page_items,
        total,
        page: request.page(),
        page_size: request.page_size(),
        total_pages: total.div_ceil(request.page_size()),
    }
}
