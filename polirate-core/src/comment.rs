//! Comment threading rules
//!
//! Comments nest exactly one level: a top-level comment (depth 0) can have
//! replies (depth 1), and replies cannot be replied to.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Deepest allowed comment depth
pub const MAX_DEPTH: i16 = 1;

/// What a comment is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentTarget {
    Post(Uuid),
    Politician(Uuid),
}

impl CommentTarget {
    /// Exactly one of `post_id` / `politician_id` must be set.
    pub fn from_ids(
        post_id: Option<Uuid>,
        politician_id: Option<Uuid>,
    ) -> Result<Self, ValidationError> {
        match (post_id, politician_id) {
            (Some(post), None) => Ok(Self::Post(post)),
            (None, Some(politician)) => Ok(Self::Politician(politician)),
            (None, None) => Err(ValidationError::Empty {
                field: "post_id or politician_id",
            }),
            (Some(_), Some(_)) => Err(ValidationError::InvalidFormat {
                field: "target",
                reason: "set either post_id or politician_id, not both",
            }),
        }
    }

    pub fn post_id(&self) -> Option<Uuid> {
        match self {
            Self::Post(id) => Some(*id),
            Self::Politician(_) => None,
        }
    }

    pub fn politician_id(&self) -> Option<Uuid> {
        match self {
            Self::Politician(id) => Some(*id),
            Self::Post(_) => None,
        }
    }
}

/// Depth of a new comment given its parent's depth (if replying).
pub fn child_depth(parent_depth: Option<i16>) -> Result<i16, ValidationError> {
    match parent_depth {
        None => Ok(0),
        Some(d) if d < MAX_DEPTH => Ok(d + 1),
        Some(_) => Err(ValidationError::InvalidFormat {
            field: "parent_id",
            reason: "replies can only be one level deep",
        }),
    }
}

/// Rows that can be assembled into comment threads
pub trait Threaded {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn set_liked(&mut self, liked: bool);
}

/// A top-level comment with its replies
#[derive(Debug, Clone, Serialize)]
pub struct CommentThread<T> {
    #[serde(flatten)]
    pub comment: T,
    pub replies: Vec<T>,
}

/// Attach `replies` to their parents in `top_level` and flag liked rows.
///
/// `top_level` order is preserved (it carries the requested sort); replies
/// keep the order they were fetched in. Replies whose parent is not on this
/// page are dropped.
pub fn assemble_threads<T: Threaded>(
    top_level: Vec<T>,
    replies: Vec<T>,
    liked: &HashSet<Uuid>,
) -> Vec<CommentThread<T>> {
    let mut by_parent: HashMap<Uuid, Vec<T>> = HashMap::new();
    for mut reply in replies {
        let Some(parent) = reply.parent_id() else {
            continue;
        };
        reply.set_liked(liked.contains(&reply.id()));
        by_parent.entry(parent).or_default().push(reply);
    }

    top_level
        .into_iter()
        .map(|mut comment| {
            comment.set_liked(liked.contains(&comment.id()));
            let replies = by_parent.remove(&comment.id()).unwrap_or_default();
            CommentThread { comment, replies }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Row {
        id: Uuid,
        parent_id: Option<Uuid>,
        liked: bool,
    }

    impl Threaded for Row {
        fn id(&self) -> Uuid {
            self.id
        }
        fn parent_id(&self) -> Option<Uuid> {
            self.parent_id
        }
        fn set_liked(&mut self, liked: bool) {
            self.liked = liked;
        }
    }

    fn row(parent: Option<Uuid>) -> Row {
        Row {
            id: Uuid::new_v4(),
            parent_id: parent,
            liked: false,
        }
    }

    #[test]
    fn target_requires_exactly_one() {
        let id = Uuid::new_v4();
        assert_eq!(
            CommentTarget::from_ids(Some(id), None).unwrap(),
            CommentTarget::Post(id)
        );
        assert!(CommentTarget::from_ids(None, None).is_err());
        assert!(CommentTarget::from_ids(Some(id), Some(id)).is_err());
    }

    #[test]
    fn depth_rules() {
        assert_eq!(child_depth(None).unwrap(), 0);
        assert_eq!(child_depth(Some(0)).unwrap(), 1);
        assert!(child_depth(Some(1)).is_err());
    }

    #[test]
    fn replies_attach_to_parents_in_order() {
        let a = row(None);
        let b = row(None);
        let r1 = row(Some(a.id));
        let r2 = row(Some(b.id));
        let r3 = row(Some(a.id));
        let (a_id, b_id, r1_id, r3_id) = (a.id, b.id, r1.id, r3.id);

        let threads = assemble_threads(
            vec![a, b],
            vec![r1, r2, r3],
            &HashSet::new(),
        );

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, a_id);
        assert_eq!(threads[1].comment.id, b_id);
        let a_replies: Vec<_> = threads[0].replies.iter().map(|r| r.id).collect();
        assert_eq!(a_replies, vec![r1_id, r3_id]);
        assert_eq!(threads[1].replies.len(), 1);
    }

    #[test]
    fn liked_flags_applied() {
        let a = row(None);
        let r = row(Some(a.id));
        let liked: HashSet<_> = [r.id].into_iter().collect();

        let threads = assemble_threads(vec![a], vec![r], &liked);
        assert!(!threads[0].comment.liked);
        assert!(threads[0].replies[0].liked);
    }

    #[test]
    fn orphan_replies_dropped() {
        let a = row(None);
        let orphan = row(Some(Uuid::new_v4()));
        let threads = assemble_threads(vec![a], vec![orphan], &HashSet::new());
        assert!(threads[0].replies.is_empty());
    }

    #[test]
    fn thread_serializes_flat() {
        let a = row(None);
        let threads = assemble_threads(vec![a], vec![], &HashSet::new());
        let json = serde_json::to_value(&threads[0]).unwrap();
        assert!(json.get("id").is_some());
        assert!(json["replies"].as_array().unwrap().is_empty());
    }
}
