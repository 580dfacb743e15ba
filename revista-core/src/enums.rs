//! Enum types for Revista documents

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Editorial lifecycle of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Draft,
    InReview,
    Approved,
    Rejected,
    Published,
    Archived,
}

impl ArticleStatus {
    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: ArticleStatus) -> bool {
        use ArticleStatus::*;
        matches!(
            (self, next),
            (Draft, InReview)
                | (InReview, Approved)
                | (InReview, Rejected)
                | (Rejected, Draft)
                | (Approved, Published)
                | (Published, Archived)
        )
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArticleStatus::Draft => "DRAFT",
            ArticleStatus::InReview => "IN_REVIEW",
            ArticleStatus::Approved => "APPROVED",
            ArticleStatus::Rejected => "REJECTED",
            ArticleStatus::Published => "PUBLISHED",
            ArticleStatus::Archived => "ARCHIVED",
        };
        f.write_str(name)
    }
}

/// Job of an editorial staff member. Becomes the caller's role claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffJob {
    Administrator,
    EditorInChief,
    Editor,
    Reviewer,
}

impl StaffJob {
    /// Jobs allowed to move articles through the editorial lifecycle.
    pub const EDITORIAL: [StaffJob; 3] = [
        StaffJob::Administrator,
        StaffJob::EditorInChief,
        StaffJob::Editor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StaffJob::Administrator => "ADMINISTRATOR",
            StaffJob::EditorInChief => "EDITOR_IN_CHIEF",
            StaffJob::Editor => "EDITOR",
            StaffJob::Reviewer => "REVIEWER",
        }
    }
}

impl fmt::Display for StaffJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffJob {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMINISTRATOR" => Ok(StaffJob::Administrator),
            "EDITOR_IN_CHIEF" => Ok(StaffJob::EditorInChief),
            "EDITOR" => Ok(StaffJob::Editor),
            "REVIEWER" => Ok(StaffJob::Reviewer),
            other => Err(format!("unknown staff job: {}", other)),
        }
    }
}

/// Kind of reader or staff interaction attached to an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionKind {
    Comment,
    EditorialNote,
}
