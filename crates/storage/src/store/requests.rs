#![forbid(unsafe_code)]

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateChapterRequest {
    pub story_id: i64,
    pub parent_id: Option<i64>,
    pub title: Option<String>,
    pub body_markdown: String,
    pub is_mainline: bool,
    pub branch_name: Option<String>,
}

/// Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateChapterRequest {
    pub chapter_id: i64,
    pub title: Option<String>,
    pub body_markdown: Option<String>,
    pub sort_order: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateForkRequest {
    pub story_seed_id: i64,
    pub origin_chapter_sort_order: Option<i64>,
    pub title: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppendCommitRequest {
    pub fork_id: i64,
    pub parent_commit_id: Option<i64>,
    pub branch_point_id: Option<i64>,
    pub option_id: Option<i64>,
    pub body_markdown: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreateBookmarkRequest {
    pub fork_id: i64,
    pub commit_id: Option<i64>,
    pub chapter_sort_order: Option<i64>,
    pub name: String,
    pub notes: Option<String>,
    pub sort_order: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreatePullRequestRequest {
    pub fork_id: i64,
    pub from_commit_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Replaces the bookmark's target, name and notes; `sort_order` moves only when given.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateBookmarkRequest {
    pub bookmark_id: i64,
    pub commit_id: Option<i64>,
    pub chapter_sort_order: Option<i64>,
    pub name: String,
    pub notes: Option<String>,
    pub sort_order: Option<i64>,
}
