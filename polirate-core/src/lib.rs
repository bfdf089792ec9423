//! polirate-core: domain rules for the politician rating platform
//!
//! Everything here is pure: validated input types, pagination and sort
//! whitelists, comment threading, report pricing and checkout states,
//! grades, and configuration loading. The HTTP and database layers live in
//! `polirate-server`.

pub mod comment;
pub mod config;
pub mod evaluation;
pub mod grade;
pub mod like;
pub mod notification;
pub mod pagination;
pub mod profile;
pub mod report;
pub mod sort;
pub mod text;
pub mod validation;

pub use comment::{assemble_threads, child_depth, CommentTarget, CommentThread, Threaded};
pub use config::PlatformConfig;
pub use evaluation::{overall_score, EvaluationCategory, EvaluationScore, RatingScore};
pub use grade::{activity_grade, influence_grade, Grade};
pub use like::LikeTarget;
pub use notification::{NotificationDraft, NotificationKind};
pub use pagination::{PageMeta, Paginated, Pagination, PaginationParams};
pub use profile::{Email, Nickname};
pub use report::{BuyerType, PriceSchedule, PurchaseAction, PurchaseStatus};
pub use sort::{CommentSort, PoliticianSort, PostSort, RatingSort, Sort, SortKey, SortOrder};
pub use text::{CommentContent, PostCategory, PostContent, PostTitle};
pub use validation::{bounded_text, ValidationError};
