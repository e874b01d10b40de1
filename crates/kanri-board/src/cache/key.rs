//! Composite cache keys.
//!
//! A key addresses one cache entry: resource kind, column scope, page
//! marker and search term. Invalidation sweeps match on resource kind so
//! that one-shot page entries and accumulated infinite entries for the same
//! logical resource are both covered.

use kanri_core::task::ColumnId;
use std::fmt;

/// The logical resource a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Tasks,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tasks => "tasks",
        }
    }
}

/// Distinguishes a one-shot page query from an accumulated infinite query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageMarker {
    /// Accumulated multi-page entry (infinite scroll).
    Infinite,
    /// A single page fetched on its own.
    Single(u32),
}

/// Identifier for one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: ResourceKind,
    pub column: Option<ColumnId>,
    pub marker: PageMarker,
    pub search: String,
}

impl QueryKey {
    /// Key for the accumulated infinite listing of one column under a
    /// search term.
    pub fn column_infinite(column: ColumnId, search: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Tasks,
            column: Some(column),
            marker: PageMarker::Infinite,
            search: search.into(),
        }
    }

    /// Key for a single page of one column under a search term.
    pub fn column_page(column: ColumnId, page: u32, search: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Tasks,
            column: Some(column),
            marker: PageMarker::Single(page),
            search: search.into(),
        }
    }

    /// Namespace predicate used by invalidation sweeps.
    pub fn matches_namespace(&self, kind: ResourceKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column.map(|c| c.as_str()).unwrap_or("*");
        let marker = match self.marker {
            PageMarker::Infinite => "inf".to_string(),
            PageMarker::Single(page) => page.to_string(),
        };
        write!(
            f,
            "{}/{}/{}/{:?}",
            self.kind.as_str(),
            column,
            marker,
            self.search
        )
    }
}
