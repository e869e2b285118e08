use super::*;
use crate::Chapter;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn chapter(id: i64, parent_id: Option<i64>, sort_order: i64) -> Chapter {
    Chapter {
        id,
        story_id: 1,
        author_id: 10,
        parent_id,
        sort_order,
        title: format!("c{id}"),
        body_markdown: String::new(),
        word_count: 0,
        is_mainline: false,
        branch_name: None,
        created_at_ms: id,
        updated_at_ms: id,
    }
}

fn mainline(mut chapter: Chapter) -> Chapter {
    chapter.is_mainline = true;
    chapter
}

fn by_author(mut chapter: Chapter, author_id: i64) -> Chapter {
    chapter.author_id = author_id;
    chapter
}

#[test]
fn build_tree_nests_children_by_sort_order() {
    let chapters = vec![
        chapter(1, None, 1),
        chapter(3, Some(1), 2),
        chapter(2, Some(1), 1),
        chapter(4, Some(2), 1),
    ];

    let forest = build_tree(&chapters);
    assert_eq!(forest.len(), 1);
    let root = &forest[0];
    assert_eq!(root.id, 1);
    let child_ids: Vec<i64> = root.children.iter().map(|node| node.id).collect();
    assert_eq!(child_ids, vec![2, 3]);
    assert_eq!(root.children[0].children[0].id, 4);
    assert_eq!(forest_ids(&forest), vec![1, 2, 4, 3]);
}

#[test]
fn build_tree_keeps_input_order_on_sort_order_ties() {
    let chapters = vec![
        chapter(1, None, 1),
        chapter(7, Some(1), 1),
        chapter(5, Some(1), 1),
        chapter(6, Some(1), 1),
    ];

    let forest = build_tree(&chapters);
    let child_ids: Vec<i64> = forest[0].children.iter().map(|node| node.id).collect();
    assert_eq!(child_ids, vec![7, 5, 6]);
}

#[test]
fn build_tree_promotes_chapters_with_absent_parent() {
    // Only author 11's chapters: 3 hangs off chapter 2 which belongs to someone else.
    let chapters = vec![chapter(3, Some(2), 1), chapter(4, Some(3), 1), chapter(9, Some(8), 2)];

    let forest = build_tree(&chapters);
    let roots: Vec<i64> = forest.iter().map(|node| node.id).collect();
    assert_eq!(roots, vec![3, 9]);
    assert_eq!(forest[0].children[0].id, 4);
}

#[test]
fn build_tree_breaks_parent_cycles_without_dropping_chapters() {
    let chapters = vec![chapter(1, Some(2), 1), chapter(2, Some(1), 1), chapter(3, None, 1)];

    let forest = build_tree(&chapters);
    let mut ids = forest_ids(&forest);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(forest[0].id, 3);
}

#[test]
fn build_tree_handles_long_chains() {
    let mut chapters = vec![chapter(1, None, 1)];
    for id in 2..=2_000 {
        chapters.push(chapter(id, Some(id - 1), 1));
    }

    let forest = build_tree(&chapters);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].subtree_ids().len(), 2_000);
}

#[test]
fn mainline_follows_the_path_when_sort_orders_are_per_parent() {
    // Root -> {Side (1), M2 (2)}, M2 -> M3 (1): M3 sorts before M2 story-wide.
    let chapters = vec![
        mainline(chapter(1, None, 1)),
        chapter(2, Some(1), 1),
        mainline(chapter(3, Some(1), 2)),
        mainline(chapter(4, Some(3), 1)),
        chapter(5, Some(4), 1),
        mainline(chapter(6, Some(4), 2)),
    ];

    let query = TreeQuery::new(&chapters);
    let ids: Vec<i64> = query.mainline().iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![1, 3, 4, 6]);
}

#[test]
fn mainline_keeps_cycle_members_after_the_path() {
    let chapters = vec![
        mainline(chapter(1, Some(2), 1)),
        mainline(chapter(2, Some(1), 1)),
        mainline(chapter(3, None, 1)),
    ];

    let ids: Vec<i64> = TreeQuery::new(&chapters)
        .mainline()
        .iter()
        .map(|node| node.id)
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[test]
fn children_returns_one_level_only() {
    let chapters = vec![
        chapter(1, None, 1),
        chapter(2, Some(1), 2),
        chapter(3, Some(1), 1),
        chapter(4, Some(2), 1),
    ];

    let query = TreeQuery::new(&chapters);
    let ids: Vec<i64> = query.children(1).iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![3, 2]);
    assert!(query.children(4).is_empty());
    assert!(query.children(99).is_empty());
}

#[test]
fn descendants_returns_subtree_rooted_at_chapter() {
    let chapters = vec![
        chapter(1, None, 1),
        chapter(2, Some(1), 1),
        chapter(3, Some(2), 1),
        chapter(4, Some(2), 2),
        chapter(5, Some(1), 2),
    ];

    let query = TreeQuery::new(&chapters);
    let subtree = query.descendants(2);
    assert_eq!(subtree.len(), 1);
    assert_eq!(forest_ids(&subtree), vec![2, 3, 4]);
    assert!(query.descendants(42).is_empty());
}

#[test]
fn ancestors_are_root_first_and_end_at_chapter() {
    let chapters = vec![
        chapter(1, None, 1),
        chapter(2, Some(1), 1),
        chapter(3, Some(2), 1),
        chapter(4, Some(1), 2),
    ];

    let query = TreeQuery::new(&chapters);
    let ids: Vec<i64> = query.ancestors(3).iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(query.full_path(3).as_deref(), Some("c1 > c2 > c3"));
    assert_eq!(query.full_path(99), None);
}

#[test]
fn ancestors_fail_soft_on_dangling_parent() {
    let chapters = vec![chapter(2, Some(1), 1), chapter(3, Some(2), 1)];

    let query = TreeQuery::new(&chapters);
    let ids: Vec<i64> = query.ancestors(3).iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![2, 3]);
}

#[test]
fn ancestors_stop_on_cycles() {
    let chapters = vec![chapter(1, Some(2), 1), chapter(2, Some(1), 1)];

    let query = TreeQuery::new(&chapters);
    let ids: Vec<i64> = query.ancestors(1).iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[test]
fn stats_for_root_two_mainline_and_one_branch() {
    let chapters = vec![
        mainline(chapter(1, None, 1)),
        mainline(chapter(2, Some(1), 1)),
        mainline(by_author(chapter(3, Some(1), 2), 11)),
        by_author(chapter(4, Some(1), 3), 12),
    ];

    let stats = TreeQuery::new(&chapters).stats();
    assert_eq!(
        stats,
        BranchStats {
            total_chapters: 4,
            mainline_chapters: 3,
            branch_chapters: 1,
            branch_points: 1,
            author_count: 3,
        }
    );
}

#[test]
fn stats_count_each_parent_once_regardless_of_fan_out() {
    let chapters = vec![
        mainline(chapter(1, None, 1)),
        mainline(chapter(2, Some(1), 1)),
        mainline(chapter(3, Some(2), 1)),
        chapter(4, Some(2), 2),
        chapter(5, Some(2), 3),
    ];

    let stats = TreeQuery::new(&chapters).stats();
    assert_eq!(stats.branch_points, 2);
    assert_eq!(stats.branch_chapters, 2);
    assert_eq!(stats.author_count, 1);
}

#[test]
fn author_branches_only_include_that_author() {
    let chapters = vec![
        chapter(1, None, 1),
        by_author(chapter(2, Some(1), 1), 11),
        by_author(chapter(3, Some(2), 1), 11),
        chapter(4, Some(3), 1),
        by_author(chapter(5, Some(1), 2), 11),
    ];

    let forest = TreeQuery::new(&chapters).author_branches(11);
    let roots: Vec<i64> = forest.iter().map(|node| node.id).collect();
    assert_eq!(roots, vec![2, 5]);
    assert_eq!(forest_ids(&forest), vec![2, 3, 5]);
}

#[test]
fn contributors_sorted_by_word_count() {
    let mut first = by_author(chapter(1, None, 1), 10);
    first.word_count = 5;
    let mut second = by_author(chapter(2, Some(1), 1), 11);
    second.word_count = 40;
    let mut third = by_author(chapter(3, Some(2), 1), 10);
    third.word_count = 7;

    let contributors = TreeQuery::new(&[first, second, third]).contributors();
    assert_eq!(contributors.len(), 2);
    assert_eq!(contributors[0].author_id, 11);
    assert_eq!(contributors[1].author_id, 10);
    assert_eq!(contributors[1].chapter_count, 2);
    assert_eq!(contributors[1].word_count, 12);
    assert_eq!(contributors[1].first_contribution_at_ms, 1);
    assert_eq!(contributors[1].last_contribution_at_ms, 3);
}

#[test]
fn chapter_node_serializes_with_children_list() {
    let forest = build_tree(&[chapter(1, None, 1), chapter(2, Some(1), 1)]);
    let value = serde_json::to_value(&forest).unwrap();
    assert_eq!(value[0]["sortOrder"], 1);
    assert_eq!(value[0]["children"][0]["id"], 2);
    assert!(value[0]["children"][0]["children"].as_array().unwrap().is_empty());
}

fn arbitrary_chapters() -> impl Strategy<Value = Vec<Chapter>> {
    prop::collection::vec((0u8..3, any::<usize>(), 0i64..4), 1..40).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(index, (kind, pick, sort_order))| {
                let id = index as i64 + 1;
                let parent_id = match kind {
                    0 => None,
                    1 => Some(1_000 + id),
                    _ if index == 0 => None,
                    _ => Some((pick % index) as i64 + 1),
                };
                chapter(id, parent_id, sort_order)
            })
            .collect()
    })
}

/// A random tree with per-parent sort orders and one root-to-leaf path flagged mainline.
/// Returns the chapters in shuffled order plus the expected path.
fn tree_with_mainline() -> impl Strategy<Value = (Vec<Chapter>, Vec<i64>)> {
    (
        prop::collection::vec(any::<usize>(), 1..40),
        any::<usize>(),
        any::<u64>(),
    )
        .prop_map(|(picks, leaf_pick, seed)| {
            let mut chapters = vec![chapter(1, None, 1)];
            let mut next_sort = vec![1i64];
            for (index, pick) in picks.into_iter().enumerate() {
                let id = index as i64 + 2;
                let parent_index = pick % chapters.len();
                next_sort[parent_index] += 1;
                let parent_id = chapters[parent_index].id;
                chapters.push(chapter(id, Some(parent_id), next_sort[parent_index] - 1));
                next_sort.push(1);
            }

            let mut path = Vec::new();
            let mut current = Some((leaf_pick % chapters.len()) as i64 + 1);
            while let Some(id) = current {
                path.push(id);
                current = chapters[id as usize - 1].parent_id;
            }
            path.reverse();
            for id in &path {
                chapters[*id as usize - 1].is_mainline = true;
            }

            let len = chapters.len();
            let offset = (seed as usize) % len;
            chapters.rotate_left(offset);
            if seed % 2 == 0 {
                chapters.reverse();
            }
            (chapters, path)
        })
}

proptest! {
    #[test]
    fn build_tree_covers_every_chapter_exactly_once(chapters in arbitrary_chapters()) {
        let forest = build_tree(&chapters);
        let mut ids = forest_ids(&forest);
        ids.sort_unstable();
        let expected: Vec<i64> = chapters.iter().map(|chapter| chapter.id).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn build_tree_roots_are_chapters_without_resolvable_parent(chapters in arbitrary_chapters()) {
        let present: BTreeSet<i64> = chapters.iter().map(|chapter| chapter.id).collect();
        let expected: BTreeSet<i64> = chapters
            .iter()
            .filter(|chapter| chapter.parent_id.is_none_or(|parent| !present.contains(&parent)))
            .map(|chapter| chapter.id)
            .collect();
        let roots: BTreeSet<i64> = build_tree(&chapters).iter().map(|node| node.id).collect();
        prop_assert_eq!(roots, expected);
    }

    #[test]
    fn ancestors_walk_parent_links_to_first_resolvable_root(chapters in arbitrary_chapters()) {
        let query = TreeQuery::new(&chapters);
        let present: BTreeSet<i64> = chapters.iter().map(|chapter| chapter.id).collect();
        let Some(last) = chapters.last() else {
            return Ok(());
        };

        let chain = query.ancestors(last.id);
        prop_assert_eq!(chain.last().map(|node| node.id), Some(last.id));
        let first = &chain[0];
        prop_assert!(first.parent_id.is_none_or(|parent| !present.contains(&parent)));
        for pair in chain.windows(2) {
            prop_assert_eq!(pair[1].parent_id, Some(pair[0].id));
        }
    }

    #[test]
    fn mainline_returns_the_flagged_path_in_order((chapters, path) in tree_with_mainline()) {
        let ids: Vec<i64> = TreeQuery::new(&chapters)
            .mainline()
            .iter()
            .map(|node| node.id)
            .collect();
        prop_assert_eq!(ids, path);
    }
}
