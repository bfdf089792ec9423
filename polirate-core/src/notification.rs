//! Notification kinds and message drafts

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::like::LikeTarget;
use crate::validation::ValidationError;

/// Notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Comment,
    Reply,
    Like,
    Follow,
    Report,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Like => "like",
            Self::Follow => "follow",
            Self::Report => "report",
            Self::System => "system",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comment" => Ok(Self::Comment),
            "reply" => Ok(Self::Reply),
            "like" => Ok(Self::Like),
            "follow" => Ok(Self::Follow),
            "report" => Ok(Self::Report),
            "system" => Ok(Self::System),
            _ => Err(ValidationError::InvalidVariant {
                field: "type",
                value: s.to_owned(),
            }),
        }
    }
}

/// A notification ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

/// Longest body excerpt quoted in a notification
const EXCERPT_CHARS: usize = 80;

fn excerpt(text: &str) -> String {
    let mut out: String = text.chars().take(EXCERPT_CHARS).collect();
    if text.chars().count() > EXCERPT_CHARS {
        out.push('…');
    }
    out
}

impl NotificationDraft {
    /// Someone replied to `recipient`'s comment.
    ///
    /// Returns `None` when the actor is the recipient.
    pub fn reply(
        recipient_id: Uuid,
        actor_id: Uuid,
        actor_name: &str,
        content: &str,
        link: String,
    ) -> Option<Self> {
        (recipient_id != actor_id).then(|| Self {
            recipient_id,
            sender_id: Some(actor_id),
            kind: NotificationKind::Reply,
            title: format!("{} replied to your comment", actor_name),
            body: Some(excerpt(content)),
            link: Some(link),
        })
    }

    /// Someone commented on `recipient`'s post.
    pub fn comment(
        recipient_id: Uuid,
        actor_id: Uuid,
        actor_name: &str,
        content: &str,
        link: String,
    ) -> Option<Self> {
        (recipient_id != actor_id).then(|| Self {
            recipient_id,
            sender_id: Some(actor_id),
            kind: NotificationKind::Comment,
            title: format!("{} commented on your post", actor_name),
            body: Some(excerpt(content)),
            link: Some(link),
        })
    }

    /// Someone liked `recipient`'s rating or comment.
    pub fn like(
        recipient_id: Uuid,
        actor_id: Uuid,
        actor_name: &str,
        target: LikeTarget,
    ) -> Option<Self> {
        (recipient_id != actor_id).then(|| Self {
            recipient_id,
            sender_id: Some(actor_id),
            kind: NotificationKind::Like,
            title: format!("{} liked your {}", actor_name, target.as_str()),
            body: None,
            link: None,
        })
    }

    /// Someone started following `recipient`.
    pub fn follow(recipient_id: Uuid, actor_id: Uuid, actor_name: &str) -> Option<Self> {
        (recipient_id != actor_id).then(|| Self {
            recipient_id,
            sender_id: Some(actor_id),
            kind: NotificationKind::Follow,
            title: format!("{} started following you", actor_name),
            body: None,
            link: Some(format!("/users/{}", actor_id)),
        })
    }

    /// A purchased report has been delivered.
    pub fn report_ready(recipient_id: Uuid, politician_name: &str, purchase_id: Uuid) -> Self {
        Self {
            recipient_id,
            sender_id: None,
            kind: NotificationKind::Report,
            title: format!("Your detailed report on {} is ready", politician_name),
            body: None,
            link: Some(format!("/report-purchase/{}", purchase_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip_names() {
        for kind in [
            NotificationKind::Comment,
            NotificationKind::Reply,
            NotificationKind::Like,
            NotificationKind::Follow,
            NotificationKind::Report,
            NotificationKind::System,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("mention".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn self_actions_are_silent() {
        let me = Uuid::new_v4();
        assert!(NotificationDraft::reply(me, me, "me", "hi", "/x".into()).is_none());
        assert!(NotificationDraft::like(me, me, "me", LikeTarget::Comment).is_none());
        assert!(NotificationDraft::follow(me, me, "me").is_none());
    }

    #[test]
    fn reply_draft() {
        let (to, from) = (Uuid::new_v4(), Uuid::new_v4());
        let draft = NotificationDraft::reply(to, from, "alice", "agreed", "/posts/1".into())
            .unwrap();
        assert_eq!(draft.kind, NotificationKind::Reply);
        assert_eq!(draft.title, "alice replied to your comment");
        assert_eq!(draft.body.as_deref(), Some("agreed"));
        assert_eq!(draft.sender_id, Some(from));
    }

    #[test]
    fn long_bodies_are_excerpted() {
        let (to, from) = (Uuid::new_v4(), Uuid::new_v4());
        let long = "가".repeat(200);
        let draft = NotificationDraft::comment(to, from, "bob", &long, "/p".into()).unwrap();
        let body = draft.body.unwrap();
        assert_eq!(body.chars().count(), EXCERPT_CHARS + 1);
        assert!(body.ends_with('…'));
    }
}
