#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;
use sb_core::StoryCommit;
use std::collections::{HashMap, HashSet};

impl SqliteStore {
    /// Appends one commit to the fork's chain. A chain has a single head: the first commit
    /// is the only one without a parent and every commit has at most one child.
    pub fn append_commit(
        &mut self,
        ctx: &RequestContext,
        request: AppendCommitRequest,
    ) -> Result<StoryCommit, StoreError> {
        if request.option_id.is_some() && request.branch_point_id.is_none() {
            return Err(StoreError::InvalidInput(
                "option_id requires branch_point_id",
            ));
        }

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let fork = fork_required(&tx, request.fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may write to the fork")?;

        match request.parent_commit_id {
            Some(parent_id) => {
                fork_commit_required(&tx, fork.id, parent_id, "parent commit not found in fork")?;
                if child_count(&tx, parent_id)? > 0 {
                    return Err(StoreError::InvalidState("parent commit already has a child"));
                }
            }
            None => {
                let existing: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM story_commits WHERE fork_id=?1",
                    params![fork.id],
                    |row| row.get(0),
                )?;
                if existing > 0 {
                    return Err(StoreError::InvalidState(
                        "fork chain already started; a parent commit is required",
                    ));
                }
            }
        }

        let sort_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM story_commits WHERE fork_id=?1",
            params![fork.id],
            |row| row.get(0),
        )?;

        tx.execute(
            r#"
            INSERT INTO story_commits(
              fork_id, parent_commit_id, branch_point_id, option_id, body_markdown, sort_order,
              created_at_ms, updated_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            "#,
            params![
                fork.id,
                request.parent_commit_id,
                request.branch_point_id,
                request.option_id,
                request.body_markdown,
                sort_order,
                now_ms
            ],
        )
        .map_err(|err| map_insert_conflict(err, "concurrent append to the fork"))?;
        let id = tx.last_insert_rowid();
        touch_fork(&tx, fork.id, now_ms)?;
        tx.commit()?;

        Ok(StoryCommit {
            id,
            fork_id: fork.id,
            parent_commit_id: request.parent_commit_id,
            branch_point_id: request.branch_point_id,
            option_id: request.option_id,
            body_markdown: request.body_markdown,
            sort_order,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    pub fn list_chain(&self, fork_id: i64) -> Result<Vec<StoryCommit>, StoreError> {
        fork_required(&self.conn, fork_id)?;
        fork_commits(&self.conn, fork_id)
    }

    pub fn get_commit(&self, commit_id: i64) -> Result<Option<StoryCommit>, StoreError> {
        commit_get(&self.conn, commit_id)
    }

    pub fn update_commit_body(
        &mut self,
        ctx: &RequestContext,
        commit_id: i64,
        body_markdown: &str,
    ) -> Result<StoryCommit, StoreError> {
        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let commit = commit_get(&tx, commit_id)?.ok_or(StoreError::NotFound("commit not found"))?;
        let fork = fork_required(&tx, commit.fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may edit the commit")?;
        if merged_chain_contains(&tx, commit_id)? {
            return Err(StoreError::InvalidState(
                "commit belongs to a merged pull request",
            ));
        }

        tx.execute(
            "UPDATE story_commits SET body_markdown=?2, updated_at_ms=?3 WHERE id=?1",
            params![commit_id, body_markdown, now_ms],
        )?;
        touch_fork(&tx, fork.id, now_ms)?;
        tx.commit()?;

        Ok(StoryCommit {
            body_markdown: body_markdown.to_string(),
            updated_at_ms: now_ms,
            ..commit
        })
    }

    /// Only the chain tail can be deleted, and never while it heads a live pull request.
    pub fn delete_commit(&mut self, ctx: &RequestContext, commit_id: i64) -> Result<(), StoreError> {
        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let commit = commit_get(&tx, commit_id)?.ok_or(StoreError::NotFound("commit not found"))?;
        let fork = fork_required(&tx, commit.fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may delete the commit")?;

        if heads_live_pull_request(&tx, commit_id)? {
            return Err(StoreError::Conflict(
                "commit heads an open or merged pull request",
            ));
        }
        if child_count(&tx, commit_id)? > 0 {
            return Err(StoreError::Conflict("commit still has a child"));
        }

        delete_commits_tail_first(&tx, std::slice::from_ref(&commit))?;
        touch_fork(&tx, fork.id, now_ms)?;
        tx.commit()?;
        Ok(())
    }

    /// Drops every commit after `commit_id`, leaving it as the chain tail. Returns the
    /// remaining chain.
    pub fn rollback_fork(
        &mut self,
        ctx: &RequestContext,
        fork_id: i64,
        commit_id: i64,
    ) -> Result<Vec<StoryCommit>, StoreError> {
        let _span = tracing::debug_span!(
            "rollback_fork",
            fork_id,
            actor_id = ctx.actor_id(),
            request_id = ctx.request_id()
        )
        .entered();

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let fork = fork_required(&tx, fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may roll back the fork")?;
        fork_commit_required(&tx, fork_id, commit_id, "commit not found in fork")?;

        let commits = fork_commits(&tx, fork_id)?;
        let child_of: HashMap<i64, &StoryCommit> = commits
            .iter()
            .filter_map(|commit| commit.parent_commit_id.map(|parent| (parent, commit)))
            .collect();

        let mut dropped: Vec<StoryCommit> = Vec::new();
        let mut seen = HashSet::from([commit_id]);
        let mut cursor = commit_id;
        while let Some(&next) = child_of.get(&cursor) {
            if !seen.insert(next.id) {
                break;
            }
            dropped.push(next.clone());
            cursor = next.id;
        }

        for commit in &dropped {
            if heads_live_pull_request(&tx, commit.id)? {
                return Err(StoreError::Conflict(
                    "rollback would drop the head of an open or merged pull request",
                ));
            }
        }

        if !dropped.is_empty() {
            delete_commits_tail_first(&tx, &dropped)?;
            let cursor_dropped = fork
                .last_read_commit_id
                .is_some_and(|cursor| dropped.iter().any(|commit| commit.id == cursor));
            if cursor_dropped {
                tx.execute(
                    "UPDATE reader_forks SET last_read_commit_id=?2 WHERE id=?1",
                    params![fork_id, commit_id],
                )?;
            }
            touch_fork(&tx, fork_id, now_ms)?;
        }

        let remaining = fork_commits(&tx, fork_id)?;
        tx.commit()?;
        tracing::debug!(dropped = dropped.len(), "fork rolled back");
        Ok(remaining)
    }
}

fn child_count(conn: &Connection, commit_id: i64) -> Result<i64, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM story_commits WHERE parent_commit_id=?1",
        params![commit_id],
        |row| row.get(0),
    )?)
}

fn heads_live_pull_request(conn: &Connection, commit_id: i64) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM story_pull_requests WHERE from_commit_id=?1 AND status IN ('open', 'merged')",
        params![commit_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn merged_chain_contains(conn: &Connection, commit_id: i64) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        r#"
        SELECT COUNT(*)
        FROM pull_request_chapters pc
        JOIN story_pull_requests pr ON pr.id = pc.pull_request_id
        WHERE pc.commit_id=?1 AND pr.status='merged'
        "#,
        params![commit_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
