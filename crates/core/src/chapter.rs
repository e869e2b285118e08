#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const MAX_TITLE_CHARS: usize = 200;

const MARKUP_CHARS: &[char] = &[
    '#', '*', '_', '`', '[', ']', '(', ')', '{', '}', '|', '>', '-',
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub story_id: i64,
    pub author_id: i64,
    pub parent_id: Option<i64>,
    pub sort_order: i64,
    pub title: String,
    pub body_markdown: String,
    pub word_count: i64,
    pub is_mainline: bool,
    pub branch_name: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Chapter {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Counts the visible characters of a markdown body: markup punctuation and all
/// whitespace are ignored.
pub fn word_count(markdown: &str) -> i64 {
    let count = markdown
        .chars()
        .filter(|ch| !ch.is_whitespace() && !MARKUP_CHARS.contains(ch))
        .count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

pub fn default_chapter_title(sort_order: i64) -> String {
    format!("Chapter {sort_order}")
}

/// Trims a user supplied title. Blank input yields `None`.
pub fn normalize_title(value: Option<&str>) -> Result<Option<String>, TitleError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(TitleError::TooLong);
    }
    if trimmed.chars().any(|ch| ch.is_control()) {
        return Err(TitleError::ContainsControl);
    }
    Ok(Some(trimmed.to_string()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TitleError {
    TooLong,
    ContainsControl,
}

impl TitleError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooLong => "title is too long",
            Self::ContainsControl => "title contains control characters",
        }
    }
}
