#![forbid(unsafe_code)]

use super::*;
use sb_core::Chapter;
use sb_core::tree::{BranchStats, ChapterNode, ContributorStats, TreeQuery};

// Every view is one range read of the story followed by in-memory reconstruction.
impl SqliteStore {
    pub fn branch_tree(&self, story_id: i64) -> Result<Vec<ChapterNode>, StoreError> {
        let chapters = story_chapters(&self.conn, story_id)?;
        Ok(TreeQuery::new(&chapters).build_tree())
    }

    pub fn mainline(&self, story_id: i64) -> Result<Vec<ChapterNode>, StoreError> {
        let chapters = story_chapters(&self.conn, story_id)?;
        Ok(TreeQuery::new(&chapters).mainline())
    }

    pub fn branch_stats(&self, story_id: i64) -> Result<BranchStats, StoreError> {
        let chapters = story_chapters(&self.conn, story_id)?;
        Ok(TreeQuery::new(&chapters).stats())
    }

    pub fn contributors(&self, story_id: i64) -> Result<Vec<ContributorStats>, StoreError> {
        let chapters = story_chapters(&self.conn, story_id)?;
        Ok(TreeQuery::new(&chapters).contributors())
    }

    pub fn author_branches(
        &self,
        story_id: i64,
        author_id: i64,
    ) -> Result<Vec<ChapterNode>, StoreError> {
        let chapters = story_chapters(&self.conn, story_id)?;
        Ok(TreeQuery::new(&chapters).author_branches(author_id))
    }

    pub fn child_chapters(&self, chapter_id: i64) -> Result<Vec<ChapterNode>, StoreError> {
        let chapters = self.chapters_around(chapter_id)?;
        Ok(TreeQuery::new(&chapters).children(chapter_id))
    }

    pub fn descendants(&self, chapter_id: i64) -> Result<Vec<ChapterNode>, StoreError> {
        let chapters = self.chapters_around(chapter_id)?;
        Ok(TreeQuery::new(&chapters).descendants(chapter_id))
    }

    pub fn ancestors(&self, chapter_id: i64) -> Result<Vec<ChapterNode>, StoreError> {
        let chapters = self.chapters_around(chapter_id)?;
        Ok(TreeQuery::new(&chapters).ancestors(chapter_id))
    }

    pub fn full_path(&self, chapter_id: i64) -> Result<String, StoreError> {
        let chapters = self.chapters_around(chapter_id)?;
        TreeQuery::new(&chapters)
            .full_path(chapter_id)
            .ok_or(StoreError::NotFound("chapter not found"))
    }

    fn chapters_around(&self, chapter_id: i64) -> Result<Vec<Chapter>, StoreError> {
        let chapter = chapter_required(&self.conn, chapter_id)?;
        story_chapters(&self.conn, chapter.story_id)
    }
}
