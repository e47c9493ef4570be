//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageKind`: The classification of a fetched page (theme, question, unknown)
//! - `PageStore`: Shared visited sets and harvested records for one crawl run
//! - `Record`: A harvested question/answer pair

mod page_kind;
mod page_store;

// Re-export main types
pub use page_kind::PageKind;
pub use page_store::{PageStore, Record, RecordMap, StoreSnapshot};
