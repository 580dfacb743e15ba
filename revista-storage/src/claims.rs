//! Staff-backed claim source.

use std::sync::Arc;

use async_trait::async_trait;
use revista_core::{ClaimSource, RevistaError, RevistaResult, Staff, StaffRecord};

use crate::traits::{find_by_field, DocumentStore};

/// Resolves a subject id to the staff document whose `user_id` matches it.
#[derive(Clone)]
pub struct StaffClaimSource {
    store: Arc<dyn DocumentStore>,
}

impl StaffClaimSource {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

impl std::fmt::Debug for StaffClaimSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaffClaimSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl ClaimSource for StaffClaimSource {
    async fn lookup(&self, subject_id: &str) -> RevistaResult<Option<StaffRecord>> {
        let staff: Vec<Staff> =
            find_by_field(self.store.as_ref(), "user_id", &[subject_id.to_string()])
                .await
                .map_err(|e| RevistaError::ClaimSource(e.to_string()))?;

        Ok(staff
            .into_iter()
            .next()
            .map(|member| StaffRecord::new(member.is_active, member.job.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use revista_core::{EntityKind, NaturalKey, StaffJob};

    fn staff(user_id: &str, job: StaffJob, is_active: bool) -> Staff {
        Staff {
            id: NaturalKey::new(format!("st-{}", user_id)),
            user_id: user_id.to_string(),
            name: "Staff Member".to_string(),
            job,
            is_active,
        }
    }

    #[tokio::test]
    async fn test_lookup_returns_job_and_activity() -> RevistaResult<()> {
        let store = MemoryStore::new().with_documents(&[
            staff("editor-1", StaffJob::Editor, true),
            staff("former-1", StaffJob::Reviewer, false),
        ])?;
        let source = StaffClaimSource::new(Arc::new(store));

        assert_eq!(
            source.lookup("editor-1").await?,
            Some(StaffRecord::new(true, "EDITOR"))
        );
        assert_eq!(
            source.lookup("former-1").await?,
            Some(StaffRecord::new(false, "REVIEWER"))
        );
        assert_eq!(source.lookup("reader-1").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_becomes_claim_source_error() -> RevistaResult<()> {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(EntityKind::Staff, true);
        let source = StaffClaimSource::new(store);

        let result = source.lookup("editor-1").await;
        assert!(matches!(result, Err(RevistaError::ClaimSource(_))));
        Ok(())
    }
}
