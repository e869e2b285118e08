#![forbid(unsafe_code)]

use crate::Chapter;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterNode {
    pub id: i64,
    pub story_id: i64,
    pub title: String,
    pub sort_order: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub is_mainline: bool,
    pub branch_name: Option<String>,
    pub word_count: i64,
    pub created_at_ms: i64,
    pub children: Vec<ChapterNode>,
}

impl ChapterNode {
    pub fn from_chapter(chapter: &Chapter) -> Self {
        Self {
            id: chapter.id,
            story_id: chapter.story_id,
            title: chapter.title.clone(),
            sort_order: chapter.sort_order,
            author_id: chapter.author_id,
            parent_id: chapter.parent_id,
            is_mainline: chapter.is_mainline,
            branch_name: chapter.branch_name.clone(),
            word_count: chapter.word_count,
            created_at_ms: chapter.created_at_ms,
            children: Vec::new(),
        }
    }

    /// Ids of this node and everything below it, pre-order.
    pub fn subtree_ids(&self) -> Vec<i64> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.id);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

pub fn forest_ids(forest: &[ChapterNode]) -> Vec<i64> {
    forest.iter().flat_map(ChapterNode::subtree_ids).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchStats {
    pub total_chapters: usize,
    pub mainline_chapters: usize,
    pub branch_chapters: usize,
    /// Distinct parent ids referenced by the set, i.e. chapters with at least one child.
    pub branch_points: usize,
    pub author_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributorStats {
    pub author_id: i64,
    pub chapter_count: usize,
    pub word_count: i64,
    pub first_contribution_at_ms: i64,
    pub last_contribution_at_ms: i64,
}
