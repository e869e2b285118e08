#![forbid(unsafe_code)]

use super::{ChapterNode, TreeQuery};
use crate::DATA_QUALITY_TARGET;
use std::collections::{HashSet, VecDeque};

impl<'a> TreeQuery<'a> {
    /// Mainline-flagged chapters in path order: by depth below their root, then sort order.
    ///
    /// Sort orders are only unique among siblings, so depth carries the path position.
    /// Connectivity is the caller's responsibility; the set is only ordered. Chapters on a
    /// parent cycle have no depth and trail the rest.
    pub fn mainline(&self) -> Vec<ChapterNode> {
        let depths = self.depths();
        let mut slots: Vec<usize> = (0..self.chapters.len())
            .filter(|slot| self.chapters[*slot].is_mainline)
            .collect();
        slots.sort_by_key(|slot| (depths[*slot], self.chapters[*slot].sort_order));
        slots
            .into_iter()
            .map(|slot| ChapterNode::from_chapter(self.chapters[slot]))
            .collect()
    }

    pub fn children(&self, chapter_id: i64) -> Vec<ChapterNode> {
        let Some(&slot) = self.slot_by_id.get(&chapter_id) else {
            return Vec::new();
        };
        self.child_slots[slot]
            .iter()
            .map(|child| ChapterNode::from_chapter(self.chapters[*child]))
            .collect()
    }

    fn depths(&self) -> Vec<usize> {
        let mut depths = vec![usize::MAX; self.chapters.len()];
        let mut queue = VecDeque::with_capacity(self.root_slots.len());
        for &root in &self.root_slots {
            depths[root] = 0;
            queue.push_back(root);
        }
        while let Some(slot) = queue.pop_front() {
            for &child in &self.child_slots[slot] {
                if depths[child] == usize::MAX {
                    depths[child] = depths[slot] + 1;
                    queue.push_back(child);
                }
            }
        }
        depths
    }

    /// The subtree rooted at `chapter_id`: the chapter itself plus everything reachable
    /// below it. Empty when the chapter is not in the set.
    pub fn descendants(&self, chapter_id: i64) -> Vec<ChapterNode> {
        let Some(&start) = self.slot_by_id.get(&chapter_id) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.chapters.len()];
        let mut built: Vec<Option<ChapterNode>> = vec![None; self.chapters.len()];
        self.materialize(start, &mut visited, &mut built)
            .into_iter()
            .collect()
    }

    /// Root-first chain ending at `chapter_id`.
    ///
    /// An unresolvable parent pointer or a cycle truncates the chain instead of failing;
    /// both are reported on the data-quality target.
    pub fn ancestors(&self, chapter_id: i64) -> Vec<ChapterNode> {
        let Some(&start) = self.slot_by_id.get(&chapter_id) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(start);
        while let Some(slot) = current {
            if !seen.insert(slot) {
                tracing::warn!(
                    target: DATA_QUALITY_TARGET,
                    chapter_id,
                    cycle_at = self.chapters[slot].id,
                    "parent cycle while walking ancestors; chain truncated"
                );
                break;
            }
            let chapter = self.chapters[slot];
            chain.push(ChapterNode::from_chapter(chapter));
            current = match chapter.parent_id {
                None => None,
                Some(parent_id) => match self.slot_by_id.get(&parent_id) {
                    Some(&parent) => Some(parent),
                    None => {
                        tracing::warn!(
                            target: DATA_QUALITY_TARGET,
                            chapter_id = chapter.id,
                            parent_id,
                            "parent chapter not resolvable; ancestor chain truncated"
                        );
                        None
                    }
                },
            };
        }

        chain.reverse();
        chain
    }

    /// Breadcrumb label, e.g. `Prologue > The Gate > Left Path`.
    pub fn full_path(&self, chapter_id: i64) -> Option<String> {
        let chain = self.ancestors(chapter_id);
        if chain.is_empty() {
            return None;
        }
        Some(
            chain
                .iter()
                .map(|node| node.title.as_str())
                .collect::<Vec<_>>()
                .join(" > "),
        )
    }

    /// Forest of one author's chapters; chapters whose parent belongs to someone else
    /// surface as subtree roots.
    pub fn author_branches(&self, author_id: i64) -> Vec<ChapterNode> {
        TreeQuery::new(
            self.chapters
                .iter()
                .copied()
                .filter(|chapter| chapter.author_id == author_id),
        )
        .build_tree()
    }
}
