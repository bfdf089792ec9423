//! Schema migrations
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so `run` is safe on
//! every startup.

use sqlx::PgPool;

use super::DbError;

const TABLES: &[(&str, &str)] = &[
    (
        "profiles",
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id UUID PRIMARY KEY,
            nickname TEXT NOT NULL,
            avatar_url TEXT,
            points BIGINT NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT profiles_nickname_key UNIQUE (nickname)
        )
        "#,
    ),
    (
        "politicians",
        r#"
        CREATE TABLE IF NOT EXISTS politicians (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            party TEXT,
            region TEXT,
            position TEXT,
            bio TEXT,
            image_url TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "politician_evaluations",
        r#"
        CREATE TABLE IF NOT EXISTS politician_evaluations (
            politician_id UUID NOT NULL REFERENCES politicians(id) ON DELETE CASCADE,
            category TEXT NOT NULL,
            score DOUBLE PRECISION NOT NULL CHECK (score >= 0 AND score <= 100),
            summary TEXT,
            model TEXT NOT NULL,
            evaluated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT politician_evaluations_pkey PRIMARY KEY (politician_id, category)
        )
        "#,
    ),
    (
        "ratings",
        r#"
        CREATE TABLE IF NOT EXISTS ratings (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            politician_id UUID NOT NULL REFERENCES politicians(id) ON DELETE CASCADE,
            score SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 5),
            comment TEXT,
            like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT ratings_user_politician_key UNIQUE (user_id, politician_id)
        )
        "#,
    ),
    (
        "posts",
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            author_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            politician_id UUID REFERENCES politicians(id) ON DELETE SET NULL,
            category TEXT NOT NULL DEFAULT 'general',
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            view_count BIGINT NOT NULL DEFAULT 0,
            like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            comment_count BIGINT NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "comments",
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            author_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            post_id UUID REFERENCES posts(id) ON DELETE CASCADE,
            politician_id UUID REFERENCES politicians(id) ON DELETE CASCADE,
            parent_id UUID REFERENCES comments(id) ON DELETE CASCADE,
            depth SMALLINT NOT NULL DEFAULT 0 CHECK (depth IN (0, 1)),
            content TEXT NOT NULL,
            like_count BIGINT NOT NULL DEFAULT 0 CHECK (like_count >= 0),
            reply_count BIGINT NOT NULL DEFAULT 0 CHECK (reply_count >= 0),
            deleted BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT comments_single_target CHECK ((post_id IS NULL) <> (politician_id IS NULL))
        )
        "#,
    ),
    (
        "likes",
        r#"
        CREATE TABLE IF NOT EXISTS likes (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            target_type TEXT NOT NULL CHECK (target_type IN ('rating', 'comment')),
            target_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT likes_user_target_key UNIQUE (user_id, target_type, target_id)
        )
        "#,
    ),
    (
        "bookmarks",
        r#"
        CREATE TABLE IF NOT EXISTS bookmarks (
            user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            politician_id UUID NOT NULL REFERENCES politicians(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT bookmarks_pkey PRIMARY KEY (user_id, politician_id)
        )
        "#,
    ),
    (
        "follows",
        r#"
        CREATE TABLE IF NOT EXISTS follows (
            follower_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            followee_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT follows_pkey PRIMARY KEY (follower_id, followee_id),
            CONSTRAINT follows_no_self CHECK (follower_id <> followee_id)
        )
        "#,
    ),
    (
        "notifications",
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            recipient_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            sender_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT,
            link TEXT,
            read_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "report_purchases",
        r#"
        CREATE TABLE IF NOT EXISTS report_purchases (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            buyer_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            politician_id UUID NOT NULL REFERENCES politicians(id) ON DELETE CASCADE,
            buyer_type TEXT NOT NULL,
            buyer_name TEXT NOT NULL,
            buyer_email TEXT NOT NULL,
            organization TEXT,
            status TEXT NOT NULL DEFAULT 'pending_verification',
            price BIGINT NOT NULL,
            purchase_number BIGINT NOT NULL,
            verification_code TEXT,
            verification_expires_at TIMESTAMPTZ,
            verification_attempts INT NOT NULL DEFAULT 0,
            payment_method TEXT,
            payment_reference TEXT,
            paid_at TIMESTAMPTZ,
            report_url TEXT,
            completed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_politicians_name ON politicians(name)",
    "CREATE INDEX IF NOT EXISTS idx_ratings_politician ON ratings(politician_id)",
    "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_posts_politician ON posts(politician_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id) WHERE parent_id IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_comments_politician ON comments(politician_id) WHERE parent_id IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_likes_target ON likes(target_type, target_id)",
    "CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_unread ON notifications(recipient_id) WHERE read_at IS NULL",
    "CREATE INDEX IF NOT EXISTS idx_report_purchases_buyer ON report_purchases(buyer_id, politician_id)",
];

/// Run all migrations
pub async fn run(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running migrations...");

    for (name, ddl) in TABLES {
        tracing::debug!(table = name, "ensuring table");
        sqlx::query(ddl).execute(pool).await?;
    }

    for ddl in INDEXES {
        sqlx::query(ddl).execute(pool).await?;
    }

    tracing::info!(tables = TABLES.len(), indexes = INDEXES.len(), "Migrations complete");
    Ok(())
}
