#![forbid(unsafe_code)]

use super::*;
use rusqlite::{OptionalExtension, params};
use sb_core::ForkBookmark;

impl SqliteStore {
    pub fn create_bookmark(
        &mut self,
        ctx: &RequestContext,
        request: CreateBookmarkRequest,
    ) -> Result<ForkBookmark, StoreError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("bookmark name must not be empty"));
        }
        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty());

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let fork = fork_required(&tx, request.fork_id)?;
        ensure_actor(ctx, fork.reader_id, "only the reader may bookmark the fork")?;
        if let Some(commit_id) = request.commit_id {
            fork_commit_required(&tx, fork.id, commit_id, "commit not found in fork")?;
        }

        let sort_order = match request.sort_order {
            Some(sort_order) => sort_order,
            None => tx.query_row(
                "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM fork_bookmarks WHERE fork_id=?1",
                params![fork.id],
                |row| row.get(0),
            )?,
        };

        tx.execute(
            r#"
            INSERT INTO fork_bookmarks(
              fork_id, reader_id, commit_id, chapter_sort_order, name, notes, sort_order,
              created_at_ms, updated_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                fork.id,
                fork.reader_id,
                request.commit_id,
                request.chapter_sort_order,
                name,
                notes,
                sort_order,
                now_ms
            ],
        )?;
        let id = tx.last_insert_rowid();
        touch_fork(&tx, fork.id, now_ms)?;
        tx.commit()?;

        Ok(ForkBookmark {
            id,
            fork_id: fork.id,
            reader_id: fork.reader_id,
            commit_id: request.commit_id,
            chapter_sort_order: request.chapter_sort_order,
            name: name.to_string(),
            notes: notes.map(str::to_string),
            sort_order,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        })
    }

    pub fn list_bookmarks(&self, fork_id: i64) -> Result<Vec<ForkBookmark>, StoreError> {
        query_rows(
            &self.conn,
            &format!(
                "SELECT {BOOKMARK_COLUMNS} FROM fork_bookmarks WHERE fork_id=?1 \
                 ORDER BY sort_order ASC, created_at_ms ASC, id ASC"
            ),
            params![fork_id],
            bookmark_from_row,
        )
    }

    pub fn update_bookmark(
        &mut self,
        ctx: &RequestContext,
        request: UpdateBookmarkRequest,
    ) -> Result<ForkBookmark, StoreError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidInput("bookmark name must not be empty"));
        }
        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty());

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let current = tx
            .query_row(
                &format!("SELECT {BOOKMARK_COLUMNS} FROM fork_bookmarks WHERE id=?1"),
                params![request.bookmark_id],
                bookmark_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound("bookmark not found"))?;
        ensure_actor(ctx, current.reader_id, "only the reader may edit the bookmark")?;
        if let Some(commit_id) = request.commit_id {
            fork_commit_required(&tx, current.fork_id, commit_id, "commit not found in fork")?;
        }
        let sort_order = request.sort_order.unwrap_or(current.sort_order);

        tx.execute(
            r#"
            UPDATE fork_bookmarks
            SET commit_id=?2, chapter_sort_order=?3, name=?4, notes=?5, sort_order=?6, updated_at_ms=?7
            WHERE id=?1
            "#,
            params![
                current.id,
                request.commit_id,
                request.chapter_sort_order,
                name,
                notes,
                sort_order,
                now_ms
            ],
        )?;
        touch_fork(&tx, current.fork_id, now_ms)?;
        tx.commit()?;

        Ok(ForkBookmark {
            commit_id: request.commit_id,
            chapter_sort_order: request.chapter_sort_order,
            name: name.to_string(),
            notes: notes.map(str::to_string),
            sort_order,
            updated_at_ms: now_ms,
            ..current
        })
    }

    pub fn delete_bookmark(&mut self, ctx: &RequestContext, bookmark_id: i64) -> Result<(), StoreError> {
        let tx = self.write_tx()?;
        let reader_id: Option<i64> = tx
            .query_row(
                "SELECT reader_id FROM fork_bookmarks WHERE id=?1",
                params![bookmark_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(reader_id) = reader_id else {
            return Err(StoreError::NotFound("bookmark not found"));
        };
        ensure_actor(ctx, reader_id, "only the reader may delete the bookmark")?;

        tx.execute("DELETE FROM fork_bookmarks WHERE id=?1", params![bookmark_id])?;
        tx.commit()?;
        Ok(())
    }
}
