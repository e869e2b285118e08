#![forbid(unsafe_code)]

use super::*;
use rusqlite::params;
use sb_core::{Chapter, default_chapter_title, normalize_title, word_count};

impl SqliteStore {
    pub fn create_chapter(
        &mut self,
        ctx: &RequestContext,
        request: CreateChapterRequest,
    ) -> Result<Chapter, StoreError> {
        ensure_positive_id(request.story_id, "story_id must be positive")?;
        let title = normalize_title(request.title.as_deref())
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let branch_name = normalize_title(request.branch_name.as_deref())
            .map_err(|_| StoreError::InvalidInput("branch_name is invalid"))?;

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let chapter = insert_chapter_tx(
            &tx,
            NewChapter {
                story_id: request.story_id,
                author_id: ctx.actor_id(),
                parent_id: request.parent_id,
                title,
                body_markdown: &request.body_markdown,
                is_mainline: request.is_mainline,
                branch_name,
            },
            now_ms,
        )?;
        tx.commit()?;
        Ok(chapter)
    }

    pub fn update_chapter(
        &mut self,
        ctx: &RequestContext,
        request: UpdateChapterRequest,
    ) -> Result<Chapter, StoreError> {
        let title = normalize_title(request.title.as_deref())
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        if let Some(sort_order) = request.sort_order
            && sort_order < 1
        {
            return Err(StoreError::InvalidInput("sort_order must be positive"));
        }

        let now_ms = now_ms();
        let tx = self.write_tx()?;
        let current = chapter_required(&tx, request.chapter_id)?;
        ensure_actor(ctx, current.author_id, "only the author may edit a chapter")?;

        let sort_order = request.sort_order.unwrap_or(current.sort_order);
        if sort_order != current.sort_order
            && let Some(parent_id) = current.parent_id
        {
            let taken: i64 = tx.query_row(
                "SELECT COUNT(*) FROM chapters WHERE parent_chapter_id=?1 AND sort_order=?2 AND id<>?3",
                params![parent_id, sort_order, current.id],
                |row| row.get(0),
            )?;
            if taken > 0 {
                return Err(StoreError::Conflict("sort_order is taken by a sibling"));
            }
        }

        let title = match (request.title.is_some(), title) {
            (true, Some(title)) => title,
            (true, None) => default_chapter_title(sort_order),
            (false, _) => current.title.clone(),
        };
        let body_markdown = request.body_markdown.unwrap_or(current.body_markdown);
        let words = word_count(&body_markdown);

        tx.execute(
            r#"
            UPDATE chapters
            SET title=?2, body_markdown=?3, word_count=?4, sort_order=?5, updated_at_ms=?6
            WHERE id=?1
            "#,
            params![current.id, title, body_markdown, words, sort_order, now_ms],
        )
        .map_err(|err| map_insert_conflict(err, "sort_order is taken by a sibling"))?;

        let updated = chapter_required(&tx, current.id)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Children must be removed or moved first; nothing is cascaded.
    pub fn delete_chapter(&mut self, ctx: &RequestContext, chapter_id: i64) -> Result<(), StoreError> {
        let tx = self.write_tx()?;
        let chapter = chapter_required(&tx, chapter_id)?;
        ensure_actor(ctx, chapter.author_id, "only the author may delete a chapter")?;

        let children: i64 = tx.query_row(
            "SELECT COUNT(*) FROM chapters WHERE parent_chapter_id=?1",
            params![chapter_id],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(StoreError::Conflict("chapter still has children"));
        }

        tx.execute("DELETE FROM chapters WHERE id=?1", params![chapter_id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_chapter(&self, chapter_id: i64) -> Result<Option<Chapter>, StoreError> {
        chapter_get(&self.conn, chapter_id)
    }

    pub fn list_story_chapters(&self, story_id: i64) -> Result<Vec<Chapter>, StoreError> {
        story_chapters(&self.conn, story_id)
    }
}

pub(super) struct NewChapter<'a> {
    pub story_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub title: Option<String>,
    pub body_markdown: &'a str,
    pub is_mainline: bool,
    pub branch_name: Option<String>,
}

/// The single insert path for chapters, shared by authors and by pull request merges.
///
/// Sibling sort order is `max + 1` under the parent; the caller's write transaction is the
/// serialization point and the partial unique indexes catch anything that slips past it.
pub(super) fn insert_chapter_tx(
    conn: &Connection,
    chapter: NewChapter<'_>,
    now_ms: i64,
) -> Result<Chapter, StoreError> {
    ensure_positive_id(chapter.story_id, "story_id must be positive")?;

    let sort_order: i64 = match chapter.parent_id {
        Some(parent_id) => {
            let parent = match chapter_get(conn, parent_id)? {
                Some(parent) if parent.story_id == chapter.story_id => parent,
                _ => return Err(StoreError::NotFound("parent chapter not found")),
            };
            if chapter.is_mainline {
                if !parent.is_mainline {
                    return Err(StoreError::InvalidState(
                        "mainline chapter requires a mainline parent",
                    ));
                }
                let mainline_children: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM chapters WHERE parent_chapter_id=?1 AND is_mainline=1",
                    params![parent_id],
                    |row| row.get(0),
                )?;
                if mainline_children > 0 {
                    return Err(StoreError::InvalidState(
                        "parent already continues the mainline",
                    ));
                }
            }
            conn.query_row(
                "SELECT COALESCE(MAX(sort_order), 0) + 1 FROM chapters WHERE parent_chapter_id=?1",
                params![parent_id],
                |row| row.get(0),
            )?
        }
        None => {
            let roots: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chapters WHERE story_id=?1 AND parent_chapter_id IS NULL",
                params![chapter.story_id],
                |row| row.get(0),
            )?;
            if roots > 0 {
                return Err(StoreError::InvalidState("story already has a root chapter"));
            }
            1
        }
    };

    let title = chapter
        .title
        .unwrap_or_else(|| default_chapter_title(sort_order));
    let words = word_count(chapter.body_markdown);

    conn.execute(
        r#"
        INSERT INTO chapters(
          story_id, author_id, parent_chapter_id, sort_order, title, body_markdown,
          word_count, is_mainline, branch_name, created_at_ms, updated_at_ms
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
        params![
            chapter.story_id,
            chapter.author_id,
            chapter.parent_id,
            sort_order,
            title,
            chapter.body_markdown,
            words,
            chapter.is_mainline,
            chapter.branch_name,
            now_ms
        ],
    )
    .map_err(|err| map_insert_conflict(err, "chapter position is already taken"))?;

    Ok(Chapter {
        id: conn.last_insert_rowid(),
        story_id: chapter.story_id,
        author_id: chapter.author_id,
        parent_id: chapter.parent_id,
        sort_order,
        title,
        body_markdown: chapter.body_markdown.to_string(),
        word_count: words,
        is_mainline: chapter.is_mainline,
        branch_name: chapter.branch_name,
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
    })
}
