//! Claim source contract consumed by identity augmentation.

use crate::RevistaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What identity augmentation needs to know about a staff member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    pub is_active: bool,
    pub job: String,
}

impl StaffRecord {
    pub fn new(is_active: bool, job: impl Into<String>) -> Self {
        Self {
            is_active,
            job: job.into(),
        }
    }
}

/// Maps a subject identifier to its staff record, if any.
///
/// A pure lookup: called at most once per inbound request, never batched and
/// never cached across requests.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn lookup(&self, subject_id: &str) -> RevistaResult<Option<StaffRecord>>;
}
