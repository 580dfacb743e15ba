//! Identity Resolution
//!
//! Runs once per inbound request, before any field resolves. It extracts the
//! caller's subject identifier from the principal's claims and, when the
//! claim source knows that subject as active editorial staff, elevates the
//! principal with exactly one role claim carrying the staff job.
//!
//! Elevation is a pure `Principal -> Principal` function that strips every
//! role claim before adding the new one, so resolving an already elevated
//! principal again changes nothing.

use std::sync::Arc;

use revista_core::ClaimSource;
use serde::Serialize;

// ============================================================================
// CLAIMS AND PRINCIPALS
// ============================================================================

/// Primary identifier claim (short form of the name identifier claim).
pub const NAME_IDENTIFIER_CLAIM: &str = "nameid";

/// Standard JWT subject claim.
pub const SUBJECT_CLAIM: &str = "sub";

/// Tertiary identifier claim emitted by some token issuers.
pub const ID_CLAIM: &str = "id";

/// Claim carrying a role.
pub const ROLE_CLAIM: &str = "role";

/// One (name, value) pair asserted about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Claim {
    pub name: String,
    pub value: String,
}

impl Claim {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The caller as seen by the service: an ordered list of claims.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    claims: Vec<Claim>,
    authenticated: bool,
}

impl Principal {
    /// A caller that presented no valid credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(claims: impl IntoIterator<Item = Claim>) -> Self {
        Self {
            claims: claims.into_iter().collect(),
            authenticated: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Value of the first claim named `name`.
    pub fn find_first(&self, name: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|claim| claim.name == name)
            .map(|claim| claim.value.as_str())
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |claim| claim.name == name)
            .map(|claim| claim.value.as_str())
    }

    pub fn roles(&self) -> Vec<&str> {
        self.find_all(ROLE_CLAIM).collect()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.find_all(ROLE_CLAIM).any(|r| r == role)
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Copy of this principal with `claim` appended.
    pub fn with_claim(&self, claim: Claim) -> Self {
        let mut next = self.clone();
        next.claims.push(claim);
        next
    }

    /// Copy of this principal without any claim named `name`.
    pub fn without_claims(&self, name: &str) -> Self {
        Self {
            claims: self
                .claims
                .iter()
                .filter(|claim| claim.name != name)
                .cloned()
                .collect(),
            authenticated: self.authenticated,
        }
    }
}

/// Replace every role claim of `principal` with a single `role` claim.
pub fn elevate(principal: &Principal, role: &str) -> Principal {
    principal
        .without_claims(ROLE_CLAIM)
        .with_claim(Claim::new(ROLE_CLAIM, role))
}

// ============================================================================
// SUBJECT EXTRACTION
// ============================================================================

/// One way of finding the caller's subject identifier.
pub trait SubjectStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The subject identifier, if this strategy finds a non-empty one.
    fn extract(&self, principal: &Principal) -> Option<String>;
}

/// Reads the first claim with a fixed name.
#[derive(Debug, Clone, Copy)]
pub struct ClaimLookup(pub &'static str);

impl SubjectStrategy for ClaimLookup {
    fn name(&self) -> &'static str {
        self.0
    }

    fn extract(&self, principal: &Principal) -> Option<String> {
        principal
            .find_all(self.0)
            .find(|value| !value.trim().is_empty())
            .map(str::to_string)
    }
}

/// `nameid`, then `sub`, then `id`.
pub fn default_strategies() -> Vec<Box<dyn SubjectStrategy>> {
    vec![
        Box::new(ClaimLookup(NAME_IDENTIFIER_CLAIM)),
        Box::new(ClaimLookup(SUBJECT_CLAIM)),
        Box::new(ClaimLookup(ID_CLAIM)),
    ]
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Where a request ended up after identity resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityState {
    /// No subject identifier could be extracted.
    Unauthenticated,
    /// A subject is known but carries no staff role.
    Authenticated,
    /// A subject was elevated with a staff role.
    Elevated,
}

/// What downstream authorization reads for the rest of the request.
///
/// `role` is set only when the subject was elevated; roles carried by the
/// token stay on the principal and are not reported here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ClaimSet {
    pub subject_id: Option<String>,
    pub role: Option<String>,
}

/// Outcome of resolving one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub principal: Principal,
    pub claims: ClaimSet,
    pub state: IdentityState,
}

impl ResolvedIdentity {
    /// Identity of a request that skipped resolution entirely.
    pub fn anonymous() -> Self {
        Self {
            principal: Principal::anonymous(),
            claims: ClaimSet::default(),
            state: IdentityState::Unauthenticated,
        }
    }
}

pub struct IdentityResolver {
    strategies: Vec<Box<dyn SubjectStrategy>>,
    claim_source: Arc<dyn ClaimSource>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("IdentityResolver")
            .field("strategies", &names)
            .field("claim_source", &"<ClaimSource>")
            .finish()
    }
}

impl IdentityResolver {
    pub fn new(claim_source: Arc<dyn ClaimSource>) -> Self {
        Self::with_strategies(default_strategies(), claim_source)
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn SubjectStrategy>>,
        claim_source: Arc<dyn ClaimSource>,
    ) -> Self {
        Self {
            strategies,
            claim_source,
        }
    }

    /// First subject identifier any strategy finds, in strategy order.
    pub fn subject_id(&self, principal: &Principal) -> Option<String> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.extract(principal))
    }

    /// Resolve `principal` once for the current request.
    ///
    /// A claim source failure leaves the principal unelevated.
    pub async fn resolve(&self, principal: &Principal) -> ResolvedIdentity {
        let Some(subject_id) = self.subject_id(principal) else {
            return ResolvedIdentity {
                principal: principal.clone(),
                claims: ClaimSet::default(),
                state: IdentityState::Unauthenticated,
            };
        };

        let (principal, role) = match self.claim_source.lookup(&subject_id).await {
            Ok(Some(record)) if record.is_active => {
                tracing::debug!(subject = %subject_id, role = %record.job, "Principal elevated");
                (elevate(principal, &record.job), Some(record.job))
            }
            Ok(_) => (principal.clone(), None),
            Err(e) => {
                tracing::warn!(
                    subject = %subject_id,
                    error = %e,
                    "Claim source lookup failed; continuing without elevation"
                );
                (principal.clone(), None)
            }
        };

        let state = if role.is_some() {
            IdentityState::Elevated
        } else {
            IdentityState::Authenticated
        };
        ResolvedIdentity {
            principal,
            claims: ClaimSet {
                subject_id: Some(subject_id),
                role,
            },
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevate_strips_then_adds() {
        let principal = Principal::authenticated([
            Claim::new(SUBJECT_CLAIM, "u-1"),
            Claim::new(ROLE_CLAIM, "READER"),
            Claim::new(ROLE_CLAIM, "AUTHOR"),
        ]);

        let elevated = elevate(&principal, "EDITOR");
        assert_eq!(elevated.roles(), vec!["EDITOR"]);
        assert_eq!(elevated.find_first(SUBJECT_CLAIM), Some("u-1"));
        assert_eq!(elevate(&elevated, "EDITOR"), elevated);
    }

    #[test]
    fn test_claim_lookup_skips_blank_values() {
        let principal = Principal::authenticated([
            Claim::new(SUBJECT_CLAIM, "  "),
            Claim::new(SUBJECT_CLAIM, "u-2"),
        ]);
        assert_eq!(ClaimLookup(SUBJECT_CLAIM).extract(&principal), Some("u-2".to_string()));
        assert_eq!(ClaimLookup(ID_CLAIM).extract(&principal), None);
    }

    #[test]
    fn test_claim_lookup_keeps_identifier_verbatim() {
        let principal = Principal::authenticated([Claim::new(SUBJECT_CLAIM, " u-1 ")]);
        assert_eq!(ClaimLookup(SUBJECT_CLAIM).extract(&principal), Some(" u-1 ".to_string()));
    }

    #[test]
    fn test_role_queries() {
        let principal = Principal::authenticated([Claim::new(ROLE_CLAIM, "REVIEWER")]);
        assert!(principal.has_role("REVIEWER"));
        assert!(principal.has_any_role(&["EDITOR", "REVIEWER"]));
        assert!(!principal.has_any_role(&["EDITOR"]));
        assert!(!Principal::anonymous().is_authenticated());
    }
}
