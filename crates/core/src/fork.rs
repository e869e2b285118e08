#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderFork {
    pub id: i64,
    pub story_seed_id: i64,
    pub reader_id: i64,
    /// 1-based mainline position the fork continues from; `None` starts at the story root.
    pub origin_chapter_sort_order: Option<i64>,
    pub last_read_commit_id: Option<i64>,
    pub title: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryCommit {
    pub id: i64,
    pub fork_id: i64,
    pub parent_commit_id: Option<i64>,
    pub branch_point_id: Option<i64>,
    pub option_id: Option<i64>,
    pub body_markdown: String,
    pub sort_order: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl StoryCommit {
    /// True when the commit came from picking a narrative option rather than free writing.
    pub fn is_choice(&self) -> bool {
        self.branch_point_id.is_some() || self.option_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkBookmark {
    pub id: i64,
    pub fork_id: i64,
    pub reader_id: i64,
    pub commit_id: Option<i64>,
    pub chapter_sort_order: Option<i64>,
    pub name: String,
    pub notes: Option<String>,
    pub sort_order: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}
