//! Like targets

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// What a like points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeTarget {
    Rating,
    Comment,
}

impl LikeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Comment => "comment",
        }
    }

    /// Table holding the target rows and their `like_count`
    pub fn table(&self) -> &'static str {
        match self {
            Self::Rating => "ratings",
            Self::Comment => "comments",
        }
    }

    /// Column naming the target row's author
    pub fn author_column(&self) -> &'static str {
        match self {
            Self::Rating => "user_id",
            Self::Comment => "author_id",
        }
    }
}

impl std::str::FromStr for LikeTarget {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rating" => Ok(Self::Rating),
            "comment" => Ok(Self::Comment),
            _ => Err(ValidationError::InvalidVariant {
                field: "target_type",
                value: s.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("Comment".parse::<LikeTarget>().unwrap(), LikeTarget::Comment);
        assert_eq!(LikeTarget::Rating.to_string(), "rating");
        assert!("post".parse::<LikeTarget>().is_err());
    }

    #[test]
    fn serde_lowercase() {
        let t: LikeTarget = serde_json::from_str(r#""rating""#).unwrap();
        assert_eq!(t, LikeTarget::Rating);
        assert_eq!(serde_json::to_string(&LikeTarget::Comment).unwrap(), r#""comment""#);
    }
}
