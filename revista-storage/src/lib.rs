//! Revista Storage - Document Store and Loader Adapters
//!
//! Defines the document store abstraction, an in-memory implementation, and
//! the fetch adapters that let loaders batch their lookups into single store
//! queries.

mod claims;
mod fetchers;
mod memory;
mod traits;

pub use claims::StaffClaimSource;
pub use fetchers::{ChildrenFetcher, EntityFetcher};
pub use memory::MemoryStore;
pub use traits::{
    decode, find_by_field, find_by_ids, find_one, insert_document, replace_document,
    DocumentStore,
};
