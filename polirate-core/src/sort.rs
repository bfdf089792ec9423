//! Whitelisted sort keys
//!
//! Client-supplied `sortBy`/`sortOrder` never reach SQL directly: they are
//! parsed into a per-resource enum whose variants map to fixed column names.

use std::fmt;

use crate::validation::ValidationError;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: Option<&str>, default: Self) -> Result<Self, ValidationError> {
        match s.map(|v| v.to_lowercase()) {
            None => Ok(default),
            Some(v) if v == "asc" => Ok(Self::Asc),
            Some(v) if v == "desc" => Ok(Self::Desc),
            Some(v) => Err(ValidationError::InvalidVariant {
                field: "sortOrder",
                value: v,
            }),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A resource's set of sortable columns
pub trait SortKey: Copy + Sized {
    /// Key used when `sortBy` is absent
    const DEFAULT: Self;

    /// Direction used when `sortOrder` is absent
    const DEFAULT_ORDER: SortOrder = SortOrder::Desc;

    fn from_param(s: &str) -> Option<Self>;

    /// Column name in the resource's query
    fn column(&self) -> &'static str;
}

/// Parsed sort specification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort<K> {
    pub key: K,
    pub order: SortOrder,
}

impl<K: SortKey> Sort<K> {
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Result<Self, ValidationError> {
        let key = match sort_by {
            None => K::DEFAULT,
            Some(raw) => K::from_param(raw).ok_or_else(|| ValidationError::InvalidVariant {
                field: "sortBy",
                value: raw.to_owned(),
            })?,
        };
        let order = SortOrder::parse(sort_order, K::DEFAULT_ORDER)?;

        Ok(Self { key, order })
    }

    /// ORDER BY body against table alias `alias`, with `id` as tie-breaker
    /// so pagination is stable.
    pub fn order_by(&self, alias: &str) -> String {
        let dir = self.order.as_sql();
        format!("{alias}.{} {dir}, {alias}.id {dir}", self.key.column())
    }
}

impl<K: SortKey> Default for Sort<K> {
    fn default() -> Self {
        Self {
            key: K::DEFAULT,
            order: K::DEFAULT_ORDER,
        }
    }
}

macro_rules! sort_keys {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident, order = $order:ident {
            $($variant:ident => $param:literal : $column:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl SortKey for $name {
            const DEFAULT: Self = Self::$default;
            const DEFAULT_ORDER: SortOrder = SortOrder::$order;

            fn from_param(s: &str) -> Option<Self> {
                match s {
                    $($param => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn column(&self) -> &'static str {
                match self {
                    $(Self::$variant => $column),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let param = match self {
                    $(Self::$variant => $param),+
                };
                f.write_str(param)
            }
        }
    };
}

sort_keys! {
    /// Sortable comment columns
    CommentSort, default = CreatedAt, order = Desc {
        CreatedAt => "created_at" : "created_at",
        LikeCount => "like_count" : "like_count",
        ReplyCount => "reply_count" : "reply_count",
    }
}

sort_keys! {
    /// Sortable post columns
    PostSort, default = CreatedAt, order = Desc {
        CreatedAt => "created_at" : "created_at",
        ViewCount => "view_count" : "view_count",
        LikeCount => "like_count" : "like_count",
        CommentCount => "comment_count" : "comment_count",
    }
}

sort_keys! {
    /// Sortable rating columns
    RatingSort, default = CreatedAt, order = Desc {
        CreatedAt => "created_at" : "created_at",
        Score => "score" : "score",
        LikeCount => "like_count" : "like_count",
    }
}

sort_keys! {
    /// Sortable politician columns
    PoliticianSort, default = Name, order = Asc {
        Name => "name" : "name",
        Rating => "rating" : "rating_avg",
        CreatedAt => "created_at" : "created_at",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s: Sort<CommentSort> = Sort::parse(None, None).unwrap();
        assert_eq!(s.key, CommentSort::CreatedAt);
        assert_eq!(s.order, SortOrder::Desc);

        let s: Sort<PoliticianSort> = Sort::parse(None, None).unwrap();
        assert_eq!(s.key, PoliticianSort::Name);
        assert_eq!(s.order, SortOrder::Asc);
    }

    #[test]
    fn parses_known_keys() {
        let s: Sort<CommentSort> = Sort::parse(Some("like_count"), Some("ASC")).unwrap();
        assert_eq!(s.key, CommentSort::LikeCount);
        assert_eq!(s.order, SortOrder::Asc);
        assert_eq!(s.order_by("c"), "c.like_count ASC, c.id ASC");
    }

    #[test]
    fn rejects_unknown_key() {
        let err = Sort::<CommentSort>::parse(Some("content; DROP TABLE comments"), None)
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidVariant { field: "sortBy", .. }));
    }

    #[test]
    fn rejects_unknown_order() {
        let err = Sort::<PostSort>::parse(None, Some("sideways")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidVariant { field: "sortOrder", .. }));
    }

    #[test]
    fn politician_rating_column() {
        let s: Sort<PoliticianSort> = Sort::parse(Some("rating"), Some("desc")).unwrap();
        assert_eq!(s.order_by("ps"), "ps.rating_avg DESC, ps.id DESC");
    }
}
