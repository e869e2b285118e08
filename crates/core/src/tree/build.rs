#![forbid(unsafe_code)]

use super::ChapterNode;
use crate::{Chapter, DATA_QUALITY_TARGET};
use std::collections::HashMap;

/// Arena over a chapter set: slots follow input order, parents are looked up by id.
///
/// Duplicate ids keep their first occurrence. A chapter whose parent is null, absent
/// from the set, or itself becomes a root. Siblings are ordered by sort order; ties keep
/// input order.
#[derive(Debug)]
pub struct TreeQuery<'a> {
    pub(super) chapters: Vec<&'a Chapter>,
    pub(super) slot_by_id: HashMap<i64, usize>,
    pub(super) child_slots: Vec<Vec<usize>>,
    pub(super) root_slots: Vec<usize>,
}

impl<'a> TreeQuery<'a> {
    pub fn new<I>(chapters: I) -> Self
    where
        I: IntoIterator<Item = &'a Chapter>,
    {
        let mut members: Vec<&'a Chapter> = Vec::new();
        let mut slot_by_id = HashMap::new();
        for chapter in chapters {
            if slot_by_id.contains_key(&chapter.id) {
                continue;
            }
            slot_by_id.insert(chapter.id, members.len());
            members.push(chapter);
        }

        let mut child_slots = vec![Vec::new(); members.len()];
        let mut root_slots = Vec::new();
        for (slot, chapter) in members.iter().enumerate() {
            let parent_slot = chapter
                .parent_id
                .and_then(|parent_id| slot_by_id.get(&parent_id).copied());
            match parent_slot {
                Some(parent) if parent != slot => child_slots[parent].push(slot),
                _ => root_slots.push(slot),
            }
        }

        let by_sort_order =
            |a: &usize, b: &usize| members[*a].sort_order.cmp(&members[*b].sort_order);
        for slots in &mut child_slots {
            slots.sort_by(by_sort_order);
        }
        root_slots.sort_by(by_sort_order);

        Self {
            chapters: members,
            slot_by_id,
            child_slots,
            root_slots,
        }
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn get(&self, chapter_id: i64) -> Option<&'a Chapter> {
        self.slot_by_id
            .get(&chapter_id)
            .map(|slot| self.chapters[*slot])
    }

    /// Nested forest covering every chapter exactly once.
    pub fn build_tree(&self) -> Vec<ChapterNode> {
        let mut visited = vec![false; self.chapters.len()];
        let mut built: Vec<Option<ChapterNode>> = vec![None; self.chapters.len()];
        let mut forest = Vec::with_capacity(self.root_slots.len());

        for &root in &self.root_slots {
            if let Some(node) = self.materialize(root, &mut visited, &mut built) {
                forest.push(node);
            }
        }

        // Anything still unvisited sits on a parent cycle: cut it at the first member.
        for slot in 0..self.chapters.len() {
            if visited[slot] {
                continue;
            }
            tracing::warn!(
                target: DATA_QUALITY_TARGET,
                chapter_id = self.chapters[slot].id,
                parent_id = ?self.chapters[slot].parent_id,
                "parent cycle in chapter set; promoting chapter to root"
            );
            if let Some(node) = self.materialize(slot, &mut visited, &mut built) {
                forest.push(node);
            }
        }

        forest
    }

    /// Post-order assembly without recursion, so long chapter chains cannot exhaust the stack.
    pub(super) fn materialize(
        &self,
        root: usize,
        visited: &mut [bool],
        built: &mut [Option<ChapterNode>],
    ) -> Option<ChapterNode> {
        visited[root] = true;
        let mut stack = vec![(root, false)];
        while let Some((slot, expanded)) = stack.pop() {
            if expanded {
                let mut node = ChapterNode::from_chapter(self.chapters[slot]);
                node.children = self.child_slots[slot]
                    .iter()
                    .filter_map(|child| built[*child].take())
                    .collect();
                built[slot] = Some(node);
                continue;
            }
            stack.push((slot, true));
            for &child in self.child_slots[slot].iter().rev() {
                if !visited[child] {
                    visited[child] = true;
                    stack.push((child, false));
                }
            }
        }
        built[root].take()
    }
}

pub fn build_tree(chapters: &[Chapter]) -> Vec<ChapterNode> {
    TreeQuery::new(chapters).build_tree()
}
