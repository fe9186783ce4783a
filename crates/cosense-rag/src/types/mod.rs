//! Core types for pages, exported documents, and search answers

pub mod page;
pub mod search;

pub use page::{ExportedDocument, Line, PageDetail, PageListing, PageSummary};
pub use search::{AskResponse, SearchChunk, SearchRequest, SearchResponse};
