#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestStatus {
    Open,
    Merged,
    Closed,
}

impl PullRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "open" => Some(Self::Open),
            "merged" => Some(Self::Merged),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn allowed_transitions(self) -> &'static [PullRequestStatus] {
        match self {
            Self::Open => &[Self::Merged, Self::Closed],
            Self::Merged | Self::Closed => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn can_transition_to(self, next: PullRequestStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn transition(self, next: PullRequestStatus) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusTransitionError {
    pub from: PullRequestStatus,
    pub to: PullRequestStatus,
}

impl std::fmt::Display for StatusTransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "illegal pull request transition ({} -> {})",
            self.from, self.to
        )
    }
}

impl std::error::Error for StatusTransitionError {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryPullRequest {
    pub id: i64,
    pub story_seed_id: i64,
    pub fork_id: i64,
    pub from_commit_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: PullRequestStatus,
    pub reviewer_id: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl StoryPullRequest {
    /// Label stamped on every chapter a merge produces.
    pub fn branch_name(&self) -> String {
        match self.title.as_deref() {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => format!("fork-{}/pr-{}", self.fork_id, self.id),
        }
    }
}

pub fn merged_chapter_title(branch_name: &str, position: usize) -> String {
    format!("{branch_name} #{position}")
}
