#![forbid(unsafe_code)]

use super::{BranchStats, ContributorStats, TreeQuery};
use std::collections::{BTreeMap, HashSet};

impl<'a> TreeQuery<'a> {
    pub fn stats(&self) -> BranchStats {
        let total_chapters = self.chapters.len();
        let mainline_chapters = self
            .chapters
            .iter()
            .filter(|chapter| chapter.is_mainline)
            .count();
        let branch_points = self
            .chapters
            .iter()
            .filter_map(|chapter| chapter.parent_id)
            .collect::<HashSet<_>>()
            .len();
        let author_count = self
            .chapters
            .iter()
            .map(|chapter| chapter.author_id)
            .collect::<HashSet<_>>()
            .len();

        BranchStats {
            total_chapters,
            mainline_chapters,
            branch_chapters: total_chapters - mainline_chapters,
            branch_points,
            author_count,
        }
    }

    /// Per-author totals, biggest word count first; ties fall back to author id.
    pub fn contributors(&self) -> Vec<ContributorStats> {
        let mut by_author: BTreeMap<i64, ContributorStats> = BTreeMap::new();
        for chapter in &self.chapters {
            let entry = by_author
                .entry(chapter.author_id)
                .or_insert_with(|| ContributorStats {
                    author_id: chapter.author_id,
                    chapter_count: 0,
                    word_count: 0,
                    first_contribution_at_ms: chapter.created_at_ms,
                    last_contribution_at_ms: chapter.updated_at_ms,
                });
            entry.chapter_count += 1;
            entry.word_count = entry.word_count.saturating_add(chapter.word_count);
            entry.first_contribution_at_ms =
                entry.first_contribution_at_ms.min(chapter.created_at_ms);
            entry.last_contribution_at_ms =
                entry.last_contribution_at_ms.max(chapter.updated_at_ms);
        }

        let mut out: Vec<ContributorStats> = by_author.into_values().collect();
        out.sort_by(|a, b| b.word_count.cmp(&a.word_count));
        out
    }
}
