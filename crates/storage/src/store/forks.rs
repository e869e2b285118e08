#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;
use sb_core::{ReaderFork, normalize_title};

impl SqliteStore {
    /// Forks are never deduplicated: one reader may hold several over the same story.
    pub fn create_fork(
        &mut self,
        ctx: &RequestContext,
        request: CreateForkRequest,
    ) -> Result<ReaderFork, StoreError> {
        ensure_positive_id(request.story_seed_id, "story_seed_id must be positive")?;
        if let Some(origin) = request.origin_chapter_sort_order
            && origin < 1
        {
            return Err(StoreError::InvalidInput(
                "origin_chapter_sort_order must be positive",
            ));
        }
        let title = normalize_title(request.title.as_deref())
            .map_err(|err| StoreError::InvalidInput(err.message()))?;

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        tx.execute(
            r#"
            INSERT INTO reader_forks(
              story_seed_id, reader_id, origin_chapter_sort_order, last_read_commit_id,
              title, created_at_ms, updated_at_ms
            )
            VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?5)
            "#,
            params![
                request.story_seed_id,
                ctx.actor_id(),
                request.origin_chapter_sort_order,
                title,
                now_ms
            ],
        )?;
        let fork = fork_required(&tx, tx.last_insert_rowid())?;
        tx.commit()?;
        Ok(fork)
    }

    pub fn get_fork(&self, fork_id: i64) -> Result<Option<ReaderFork>, StoreError> {
        fork_get(&self.conn, fork_id)
    }

    pub fn list_reader_forks(&self, reader_id: i64) -> Result<Vec<ReaderFork>, StoreError> {
        query_rows(
            &self.conn,
            &format!(
                "SELECT {FORK_COLUMNS} FROM reader_forks WHERE reader_id=?1 \
                 ORDER BY updated_at_ms DESC, id DESC"
            ),
            params![reader_id],
            fork_from_row,
        )
    }

    /// Moves (or clears) the reader's last-read position.
    pub fn update_fork_cursor(
        &mut self,
        ctx: &RequestContext,
        fork_id: i64,
        last_read_commit_id: Option<i64>,
    ) -> Result<ReaderFork, StoreError> {
        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let fork = fork_required(&tx, fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may move the fork cursor")?;
        if let Some(commit_id) = last_read_commit_id {
            fork_commit_required(&tx, fork_id, commit_id, "commit not found in fork")?;
        }

        tx.execute(
            "UPDATE reader_forks SET last_read_commit_id=?2, updated_at_ms=?3 WHERE id=?1",
            params![fork_id, last_read_commit_id, now_ms],
        )?;
        let updated = fork_required(&tx, fork_id)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Drops the fork with its commits, bookmarks and closed pull requests.
    pub fn delete_fork(&mut self, ctx: &RequestContext, fork_id: i64) -> Result<(), StoreError> {
        let _span = tracing::debug_span!(
            "delete_fork",
            fork_id,
            actor_id = ctx.actor_id(),
            request_id = ctx.request_id()
        )
        .entered();

        let tx = self.write_tx()?;
        let fork = fork_required(&tx, fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may delete the fork")?;

        let referenced: i64 = tx.query_row(
            "SELECT COUNT(*) FROM story_pull_requests WHERE fork_id=?1 AND status IN ('open', 'merged')",
            params![fork_id],
            |row| row.get(0),
        )?;
        if referenced > 0 {
            return Err(StoreError::Conflict(
                "fork is referenced by an open or merged pull request",
            ));
        }

        let commits = fork_commits(&tx, fork_id)?;
        delete_commits_tail_first(&tx, &commits)?;
        tx.execute("DELETE FROM reader_forks WHERE id=?1", params![fork_id])?;
        tx.commit()?;
        tracing::debug!(commits = commits.len(), "fork deleted");
        Ok(())
    }
}
