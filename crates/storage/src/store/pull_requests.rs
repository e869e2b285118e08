#![forbid(unsafe_code)]

use super::chapters::{NewChapter, insert_chapter_tx};
use super::*;
use rusqlite::{OptionalExtension, params};
use sb_core::{
    Chapter, PullRequestStatus, ReaderFork, StoryCommit, StoryPullRequest, merged_chapter_title,
    normalize_title,
};
use std::collections::{HashMap, HashSet};

impl SqliteStore {
    pub fn create_pull_request(
        &mut self,
        ctx: &RequestContext,
        request: CreatePullRequestRequest,
    ) -> Result<StoryPullRequest, StoreError> {
        let title = normalize_title(request.title.as_deref())
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let fork = fork_required(&tx, request.fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may propose the fork")?;
        fork_commit_required(&tx, fork.id, request.from_commit_id, "commit not found in fork")?;

        tx.execute(
            r#"
            INSERT INTO story_pull_requests(
              story_seed_id, fork_id, from_commit_id, title, description, status, reviewer_id,
              created_at_ms, updated_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?7)
            "#,
            params![
                fork.story_seed_id,
                fork.id,
                request.from_commit_id,
                title,
                description,
                PullRequestStatus::Open.as_str(),
                now_ms
            ],
        )?;
        let pull_request = pull_request_required(&tx, tx.last_insert_rowid())?;
        tx.commit()?;
        Ok(pull_request)
    }

    pub fn get_pull_request(
        &self,
        pull_request_id: i64,
    ) -> Result<Option<StoryPullRequest>, StoreError> {
        pull_request_get(&self.conn, pull_request_id)
    }

    pub fn list_story_pull_requests(
        &self,
        story_id: i64,
    ) -> Result<Vec<StoryPullRequest>, StoreError> {
        query_rows(
            &self.conn,
            &format!(
                "SELECT {PULL_REQUEST_COLUMNS} FROM story_pull_requests WHERE story_seed_id=?1 \
                 ORDER BY created_at_ms DESC, id DESC"
            ),
            params![story_id],
            pull_request_from_row,
        )
    }

    pub fn list_fork_pull_requests(
        &self,
        fork_id: i64,
    ) -> Result<Vec<StoryPullRequest>, StoreError> {
        query_rows(
            &self.conn,
            &format!(
                "SELECT {PULL_REQUEST_COLUMNS} FROM story_pull_requests WHERE fork_id=?1 \
                 ORDER BY created_at_ms DESC, id DESC"
            ),
            params![fork_id],
            pull_request_from_row,
        )
    }

    /// Materializes the proposed chain as new chapters under the fork's origin and marks the
    /// pull request merged, all in one transaction. Any failure leaves the tree untouched and
    /// the pull request open.
    pub fn merge_pull_request(
        &mut self,
        ctx: &RequestContext,
        pull_request_id: i64,
    ) -> Result<StoryPullRequest, StoreError> {
        let span = tracing::info_span!(
            "merge_pull_request",
            pull_request_id,
            actor_id = ctx.actor_id(),
            request_id = ctx.request_id()
        );
        let _guard = span.enter();

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let pull_request = pull_request_required(&tx, pull_request_id)?;
        pull_request.status.transition(PullRequestStatus::Merged)?;

        let fork = fork_required(&tx, pull_request.fork_id)?;
        let chain = proposed_chain(&tx, &fork, pull_request.from_commit_id)?;
        let mut parent_id = resolve_origin(&tx, &fork)?;
        let branch_name = pull_request.branch_name();

        for (index, commit) in chain.iter().enumerate() {
            let position = index + 1;
            let chapter = insert_chapter_tx(
                &tx,
                NewChapter {
                    story_id: fork.story_seed_id,
                    author_id: fork.reader_id,
                    parent_id,
                    title: Some(merged_chapter_title(&branch_name, position)),
                    body_markdown: &commit.body_markdown,
                    is_mainline: false,
                    branch_name: Some(branch_name.clone()),
                },
                now_ms,
            )?;
            tx.execute(
                "INSERT INTO pull_request_chapters(pull_request_id, position, commit_id, chapter_id) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    pull_request_id,
                    i64::try_from(position).unwrap_or(i64::MAX),
                    commit.id,
                    chapter.id
                ],
            )?;
            parent_id = Some(chapter.id);
        }

        let changed = tx.execute(
            "UPDATE story_pull_requests SET status=?2, reviewer_id=?3, updated_at_ms=?4 \
             WHERE id=?1 AND status=?5",
            params![
                pull_request_id,
                PullRequestStatus::Merged.as_str(),
                ctx.actor_id(),
                now_ms,
                PullRequestStatus::Open.as_str()
            ],
        )?;
        if changed != 1 {
            return Err(StoreError::Conflict("pull request changed during merge"));
        }

        let merged = pull_request_required(&tx, pull_request_id)?;
        tx.commit()?;

        tracing::info!(
            story_id = fork.story_seed_id,
            fork_id = fork.id,
            chapters = chain.len(),
            branch = %branch_name,
            "pull request merged"
        );
        Ok(merged)
    }

    pub fn close_pull_request(
        &mut self,
        ctx: &RequestContext,
        pull_request_id: i64,
    ) -> Result<StoryPullRequest, StoreError> {
        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let pull_request = pull_request_required(&tx, pull_request_id)?;
        let next = pull_request.status.transition(PullRequestStatus::Closed)?;

        let changed = tx.execute(
            "UPDATE story_pull_requests SET status=?2, reviewer_id=?3, updated_at_ms=?4 \
             WHERE id=?1 AND status=?5",
            params![
                pull_request_id,
                next.as_str(),
                ctx.actor_id(),
                now_ms,
                pull_request.status.as_str()
            ],
        )?;
        if changed != 1 {
            return Err(StoreError::Conflict("pull request changed concurrently"));
        }

        let closed = pull_request_required(&tx, pull_request_id)?;
        tx.commit()?;
        Ok(closed)
    }

    /// Chapters a merge produced, in chain order.
    pub fn merged_chapters(&self, pull_request_id: i64) -> Result<Vec<Chapter>, StoreError> {
        pull_request_required(&self.conn, pull_request_id)?;
        query_rows(
            &self.conn,
            &format!(
                "SELECT {CHAPTER_COLUMNS} FROM chapters \
                 JOIN pull_request_chapters ON pull_request_chapters.chapter_id = chapters.id \
                 WHERE pull_request_chapters.pull_request_id=?1 \
                 ORDER BY pull_request_chapters.position ASC"
            ),
            params![pull_request_id],
            chapter_from_row,
        )
    }
}

/// The chain from the fork's first commit up to `head_id`, oldest first.
fn proposed_chain(
    conn: &Connection,
    fork: &ReaderFork,
    head_id: i64,
) -> Result<Vec<StoryCommit>, StoreError> {
    let mut by_id: HashMap<i64, StoryCommit> = fork_commits(conn, fork.id)?
        .into_iter()
        .map(|commit| (commit.id, commit))
        .collect();

    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(head_id);
    while let Some(commit_id) = current {
        if !seen.insert(commit_id) {
            return Err(StoreError::InvalidState("commit chain contains a cycle"));
        }
        let commit = by_id
            .remove(&commit_id)
            .ok_or(StoreError::NotFound("proposed commit not found in fork"))?;
        current = commit.parent_commit_id;
        chain.push(commit);
    }

    chain.reverse();
    Ok(chain)
}

/// Origin `n` is the n-th chapter along the mainline from the root; no origin means the root.
/// `Ok(None)` only for an empty story, where the merge starts the tree.
fn resolve_origin(conn: &Connection, fork: &ReaderFork) -> Result<Option<i64>, StoreError> {
    let root: Option<i64> = conn
        .query_row(
            "SELECT id FROM chapters WHERE story_id=?1 AND parent_chapter_id IS NULL",
            params![fork.story_seed_id],
            |row| row.get(0),
        )
        .optional()?;

    let (Some(position), Some(root)) = (fork.origin_chapter_sort_order, root) else {
        return match (fork.origin_chapter_sort_order, root) {
            (None, root) => Ok(root),
            (Some(_), _) => Err(StoreError::NotFound("origin chapter not found")),
        };
    };

    let mut current = root;
    for _ in 1..position {
        current = conn
            .query_row(
                "SELECT id FROM chapters WHERE parent_chapter_id=?1 AND is_mainline=1",
                params![current],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound("origin chapter not found"))?;
    }
    Ok(Some(current))
}
