//! Validated text fields for comments and posts

use serde::{Deserialize, Serialize};

use crate::validation::{bounded_text, ValidationError};

/// Maximum length for comment content
pub const MAX_COMMENT_LEN: usize = 1000;

/// Maximum length for post titles
pub const MAX_POST_TITLE_LEN: usize = 200;

/// Maximum length for post bodies
pub const MAX_POST_CONTENT_LEN: usize = 10_000;

/// Validated comment content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContent(String);

impl CommentContent {
    /// Create new comment content.
    ///
    /// # Rules
    /// - Non-empty after trimming whitespace
    /// - Max 1000 characters
    ///
    /// # Example
    /// ```
    /// use polirate_core::CommentContent;
    ///
    /// assert!(CommentContent::new("Good point").is_ok());
    /// assert!(CommentContent::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text("content", s, 1, MAX_COMMENT_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated post title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTitle(String);

impl PostTitle {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text("title", s, 1, MAX_POST_TITLE_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validated post body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent(String);

impl PostContent {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        bounded_text("content", s, 1, MAX_POST_CONTENT_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Community post category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    General,
    Question,
    Debate,
    News,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Question => "question",
            Self::Debate => "debate",
            Self::News => "news",
        }
    }
}

impl Default for PostCategory {
    fn default() -> Self {
        Self::General
    }
}

impl std::str::FromStr for PostCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "general" => Ok(Self::General),
            "question" => Ok(Self::Question),
            "debate" => Ok(Self::Debate),
            "news" => Ok(Self::News),
            _ => Err(ValidationError::InvalidVariant {
                field: "category",
                value: s.to_owned(),
            }),
        }
    }
}
