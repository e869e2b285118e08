#![forbid(unsafe_code)]

use super::StoreError;
use super::support::{now_ms, query_rows};
use rusqlite::{Connection, OptionalExtension, params};

const SCHEMA_VERSION: i64 = 1;

const STORY_TABLES: &[&str] = &[
    "store_state",
    "chapters",
    "reader_forks",
    "story_commits",
    "fork_bookmarks",
    "story_pull_requests",
    "pull_request_chapters",
];

/// An empty file is fresh. Anything else must be this schema at this version; foreign
/// tables or another version need an explicit reset.
pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let tables: Vec<String> = query_rows(
        conn,
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    if tables.is_empty() {
        return Ok(());
    }
    if tables
        .iter()
        .any(|table| !STORY_TABLES.contains(&table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: database holds tables this store does not own",
        ));
    }

    let version: Option<i64> = if tables.iter().any(|table| table == "store_state") {
        conn.query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get(0),
        )
        .optional()?
    } else {
        None
    };
    if version == Some(SCHEMA_VERSION) {
        Ok(())
    } else {
        Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        ))
    }
}

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chapters (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          story_id INTEGER NOT NULL,
          author_id INTEGER NOT NULL,
          parent_chapter_id INTEGER,
          sort_order INTEGER NOT NULL CHECK(sort_order >= 1),
          title TEXT NOT NULL,
          body_markdown TEXT NOT NULL,
          word_count INTEGER NOT NULL,
          is_mainline INTEGER NOT NULL DEFAULT 0 CHECK(is_mainline IN (0, 1)),
          branch_name TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(parent_chapter_id) REFERENCES chapters(id) ON DELETE RESTRICT,
          CHECK(parent_chapter_id IS NULL OR parent_chapter_id <> id)
        );

        CREATE INDEX IF NOT EXISTS idx_chapters_story_sort
          ON chapters(story_id, sort_order, id);

        CREATE INDEX IF NOT EXISTS idx_chapters_story_author
          ON chapters(story_id, author_id);

        CREATE UNIQUE INDEX IF NOT EXISTS uq_chapters_story_root
          ON chapters(story_id) WHERE parent_chapter_id IS NULL;

        CREATE UNIQUE INDEX IF NOT EXISTS uq_chapters_sibling_sort
          ON chapters(parent_chapter_id, sort_order) WHERE parent_chapter_id IS NOT NULL;

        CREATE UNIQUE INDEX IF NOT EXISTS uq_chapters_mainline_child
          ON chapters(parent_chapter_id) WHERE is_mainline = 1 AND parent_chapter_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS reader_forks (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          story_seed_id INTEGER NOT NULL,
          reader_id INTEGER NOT NULL,
          origin_chapter_sort_order INTEGER CHECK(origin_chapter_sort_order IS NULL OR origin_chapter_sort_order >= 1),
          last_read_commit_id INTEGER,
          title TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(last_read_commit_id) REFERENCES story_commits(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reader_forks_reader_updated
          ON reader_forks(reader_id, updated_at_ms, id);

        CREATE TABLE IF NOT EXISTS story_commits (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          fork_id INTEGER NOT NULL,
          parent_commit_id INTEGER,
          branch_point_id INTEGER,
          option_id INTEGER,
          body_markdown TEXT NOT NULL,
          sort_order INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE(fork_id, sort_order),
          FOREIGN KEY(fork_id) REFERENCES reader_forks(id) ON DELETE CASCADE,
          FOREIGN KEY(parent_commit_id) REFERENCES story_commits(id) ON DELETE CASCADE,
          CHECK(parent_commit_id IS NULL OR parent_commit_id <> id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS uq_story_commits_single_child
          ON story_commits(parent_commit_id) WHERE parent_commit_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS fork_bookmarks (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          fork_id INTEGER NOT NULL,
          reader_id INTEGER NOT NULL,
          commit_id INTEGER,
          chapter_sort_order INTEGER,
          name TEXT NOT NULL,
          notes TEXT,
          sort_order INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(fork_id) REFERENCES reader_forks(id) ON DELETE CASCADE,
          FOREIGN KEY(commit_id) REFERENCES story_commits(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_fork_bookmarks_fork_sort
          ON fork_bookmarks(fork_id, sort_order, created_at_ms);

        CREATE TABLE IF NOT EXISTS story_pull_requests (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          story_seed_id INTEGER NOT NULL,
          fork_id INTEGER NOT NULL,
          from_commit_id INTEGER NOT NULL,
          title TEXT,
          description TEXT,
          status TEXT NOT NULL CHECK(status IN ('open', 'merged', 'closed')),
          reviewer_id INTEGER,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(fork_id) REFERENCES reader_forks(id) ON DELETE CASCADE,
          FOREIGN KEY(from_commit_id) REFERENCES story_commits(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_story_pull_requests_story_created
          ON story_pull_requests(story_seed_id, created_at_ms, id);

        CREATE INDEX IF NOT EXISTS idx_story_pull_requests_fork
          ON story_pull_requests(fork_id, status);

        CREATE TABLE IF NOT EXISTS pull_request_chapters (
          pull_request_id INTEGER NOT NULL,
          position INTEGER NOT NULL,
          commit_id INTEGER NOT NULL,
          chapter_id INTEGER NOT NULL,
          PRIMARY KEY(pull_request_id, position),
          FOREIGN KEY(pull_request_id) REFERENCES story_pull_requests(id) ON DELETE CASCADE,
          FOREIGN KEY(commit_id) REFERENCES story_commits(id) ON DELETE CASCADE,
          FOREIGN KEY(chapter_id) REFERENCES chapters(id) ON DELETE CASCADE
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}
