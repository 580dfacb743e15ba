//! Revista Core - Entity Types
//!
//! Pure data structures shared by every other crate: entity kinds and lookup
//! keys, the stored documents, the claim source contract and the error
//! taxonomy. No I/O lives here.

mod claims;
mod entities;
mod enums;
mod error;
mod identity;

pub use claims::{ClaimSource, StaffRecord};
pub use entities::{
    Article, ArticleHistory, Author, Document, Editorial, Interaction, Staff, Volume,
};
pub use enums::{ArticleStatus, InteractionKind, StaffJob};
pub use error::{ConfigError, LoaderError, RevistaError, RevistaResult, StorageError};
pub use identity::{new_document_id, EntityKind, LookupKey, NaturalKey, Timestamp};
