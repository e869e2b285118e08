#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Params, Row, ffi, params};
use sb_core::{
    Chapter, ForkBookmark, PullRequestStatus, ReaderFork, StoryCommit, StoryPullRequest,
};
use std::time::{SystemTime, UNIX_EPOCH};

pub(super) const CHAPTER_COLUMNS: &str = "id, story_id, author_id, parent_chapter_id, sort_order, title, \
     body_markdown, word_count, is_mainline, branch_name, created_at_ms, updated_at_ms";

pub(super) const FORK_COLUMNS: &str = "id, story_seed_id, reader_id, origin_chapter_sort_order, \
     last_read_commit_id, title, created_at_ms, updated_at_ms";

pub(super) const COMMIT_COLUMNS: &str = "id, fork_id, parent_commit_id, branch_point_id, option_id, \
     body_markdown, sort_order, created_at_ms, updated_at_ms";

pub(super) const BOOKMARK_COLUMNS: &str = "id, fork_id, reader_id, commit_id, chapter_sort_order, \
     name, notes, sort_order, created_at_ms, updated_at_ms";

pub(super) const PULL_REQUEST_COLUMNS: &str = "id, story_seed_id, fork_id, from_commit_id, title, \
     description, status, reviewer_id, created_at_ms, updated_at_ms";

pub(super) fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        story_id: row.get(1)?,
        author_id: row.get(2)?,
        parent_id: row.get(3)?,
        sort_order: row.get(4)?,
        title: row.get(5)?,
        body_markdown: row.get(6)?,
        word_count: row.get(7)?,
        is_mainline: row.get(8)?,
        branch_name: row.get(9)?,
        created_at_ms: row.get(10)?,
        updated_at_ms: row.get(11)?,
    })
}

pub(super) fn fork_from_row(row: &Row<'_>) -> rusqlite::Result<ReaderFork> {
    Ok(ReaderFork {
        id: row.get(0)?,
        story_seed_id: row.get(1)?,
        reader_id: row.get(2)?,
        origin_chapter_sort_order: row.get(3)?,
        last_read_commit_id: row.get(4)?,
        title: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

pub(super) fn commit_from_row(row: &Row<'_>) -> rusqlite::Result<StoryCommit> {
    Ok(StoryCommit {
        id: row.get(0)?,
        fork_id: row.get(1)?,
        parent_commit_id: row.get(2)?,
        branch_point_id: row.get(3)?,
        option_id: row.get(4)?,
        body_markdown: row.get(5)?,
        sort_order: row.get(6)?,
        created_at_ms: row.get(7)?,
        updated_at_ms: row.get(8)?,
    })
}

pub(super) fn bookmark_from_row(row: &Row<'_>) -> rusqlite::Result<ForkBookmark> {
    Ok(ForkBookmark {
        id: row.get(0)?,
        fork_id: row.get(1)?,
        reader_id: row.get(2)?,
        commit_id: row.get(3)?,
        chapter_sort_order: row.get(4)?,
        name: row.get(5)?,
        notes: row.get(6)?,
        sort_order: row.get(7)?,
        created_at_ms: row.get(8)?,
        updated_at_ms: row.get(9)?,
    })
}

pub(super) fn pull_request_from_row(row: &Row<'_>) -> rusqlite::Result<StoryPullRequest> {
    let status_raw: String = row.get(6)?;
    let status = PullRequestStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(6, "status".to_string(), Type::Text)
    })?;
    Ok(StoryPullRequest {
        id: row.get(0)?,
        story_seed_id: row.get(1)?,
        fork_id: row.get(2)?,
        from_commit_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        status,
        reviewer_id: row.get(7)?,
        created_at_ms: row.get(8)?,
        updated_at_ms: row.get(9)?,
    })
}

pub(super) fn query_rows<T, P, F>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: F,
) -> Result<Vec<T>, StoreError>
where
    P: Params,
    F: Fn(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(map(row)?);
    }
    Ok(out)
}

pub(super) fn chapter_get(conn: &Connection, chapter_id: i64) -> Result<Option<Chapter>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id=?1"),
            params![chapter_id],
            chapter_from_row,
        )
        .optional()?)
}

pub(super) fn chapter_required(conn: &Connection, chapter_id: i64) -> Result<Chapter, StoreError> {
    chapter_get(conn, chapter_id)?.ok_or(StoreError::NotFound("chapter not found"))
}

/// Every chapter of a story in one range read, ordered by sort order then id.
pub(super) fn story_chapters(conn: &Connection, story_id: i64) -> Result<Vec<Chapter>, StoreError> {
    query_rows(
        conn,
        &format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE story_id=?1 ORDER BY sort_order ASC, id ASC"
        ),
        params![story_id],
        chapter_from_row,
    )
}

pub(super) fn fork_get(conn: &Connection, fork_id: i64) -> Result<Option<ReaderFork>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {FORK_COLUMNS} FROM reader_forks WHERE id=?1"),
            params![fork_id],
            fork_from_row,
        )
        .optional()?)
}

pub(super) fn fork_required(conn: &Connection, fork_id: i64) -> Result<ReaderFork, StoreError> {
    fork_get(conn, fork_id)?.ok_or(StoreError::NotFound("fork not found"))
}

pub(super) fn commit_get(conn: &Connection, commit_id: i64) -> Result<Option<StoryCommit>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {COMMIT_COLUMNS} FROM story_commits WHERE id=?1"),
            params![commit_id],
            commit_from_row,
        )
        .optional()?)
}

/// Resolves a commit only when it belongs to `fork_id`.
pub(super) fn fork_commit_required(
    conn: &Connection,
    fork_id: i64,
    commit_id: i64,
    message: &'static str,
) -> Result<StoryCommit, StoreError> {
    match commit_get(conn, commit_id)? {
        Some(commit) if commit.fork_id == fork_id => Ok(commit),
        _ => Err(StoreError::NotFound(message)),
    }
}

pub(super) fn fork_commits(conn: &Connection, fork_id: i64) -> Result<Vec<StoryCommit>, StoreError> {
    query_rows(
        conn,
        &format!(
            "SELECT {COMMIT_COLUMNS} FROM story_commits WHERE fork_id=?1 ORDER BY sort_order ASC"
        ),
        params![fork_id],
        commit_from_row,
    )
}

pub(super) fn pull_request_get(
    conn: &Connection,
    pull_request_id: i64,
) -> Result<Option<StoryPullRequest>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {PULL_REQUEST_COLUMNS} FROM story_pull_requests WHERE id=?1"),
            params![pull_request_id],
            pull_request_from_row,
        )
        .optional()?)
}

pub(super) fn pull_request_required(
    conn: &Connection,
    pull_request_id: i64,
) -> Result<StoryPullRequest, StoreError> {
    pull_request_get(conn, pull_request_id)?.ok_or(StoreError::NotFound("pull request not found"))
}

pub(super) fn touch_fork(conn: &Connection, fork_id: i64, now_ms: i64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE reader_forks SET updated_at_ms=MAX(updated_at_ms, ?2) WHERE id=?1",
        params![fork_id, now_ms],
    )?;
    Ok(())
}

/// Only unique-index collisions (a lost `max + 1` race) become `Conflict`; every other
/// constraint failure is deterministic and surfaces unchanged.
pub(super) fn map_insert_conflict(err: rusqlite::Error, message: &'static str) -> StoreError {
    if is_unique_collision(&err) {
        StoreError::Conflict(message)
    } else {
        StoreError::from(err)
    }
}

fn is_unique_collision(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

pub(super) fn ensure_positive_id(value: i64, message: &'static str) -> Result<(), StoreError> {
    if value > 0 {
        Ok(())
    } else {
        Err(StoreError::InvalidInput(message))
    }
}

pub(super) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

/// Deletes commits newest first so no delete ever cascades down a parent chain.
pub(super) fn delete_commits_tail_first(
    conn: &Connection,
    commits: &[StoryCommit],
) -> Result<(), StoreError> {
    let mut ordered: Vec<&StoryCommit> = commits.iter().collect();
    ordered.sort_by_key(|commit| std::cmp::Reverse(commit.sort_order));
    let mut stmt = conn.prepare("DELETE FROM story_commits WHERE id=?1")?;
    for commit in ordered {
        stmt.execute(params![commit.id])?;
    }
    Ok(())
}
