//! Politician directory with rating and evaluation aggregates

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use polirate_core::{Paginated, Pagination, PoliticianSort, Sort};

use super::super::DbError;
use super::{fetch_page, like_pattern};

/// List row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PoliticianSummary {
    pub id: Uuid,
    pub name: String,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub image_url: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i64,
    /// Mean AI evaluation score, one decimal
    pub evaluation_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Detail view
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PoliticianDetail {
    pub id: Uuid,
    pub name: String,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub evaluation_score: Option<f64>,
    pub bookmark_count: i64,
    /// Whether the viewer bookmarked this politician
    pub bookmarked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List filters; all optional
#[derive(Debug, Clone, Default)]
pub struct PoliticianFilter {
    /// Substring match on name
    pub q: Option<String>,
    pub party: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPolitician {
    pub name: String,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct PoliticianPatch {
    pub name: Option<String>,
    pub party: Option<String>,
    pub region: Option<String>,
    pub position: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

/// Politicians joined with their rating and evaluation aggregates
const AGGREGATED: &str = r#"
    SELECT
        p.id, p.name, p.party, p.region, p.position, p.bio, p.image_url,
        p.created_at, p.updated_at,
        COALESCE(r.rating_avg, 0)::float8 AS rating_avg,
        COALESCE(r.rating_count, 0) AS rating_count,
        e.evaluation_score
    FROM politicians p
    LEFT JOIN (
        SELECT politician_id,
               ROUND(AVG(score)::numeric, 2)::float8 AS rating_avg,
               COUNT(*) AS rating_count
        FROM ratings GROUP BY politician_id
    ) r ON r.politician_id = p.id
    LEFT JOIN (
        SELECT politician_id, ROUND(AVG(score)::numeric, 1)::float8 AS evaluation_score
        FROM politician_evaluations GROUP BY politician_id
    ) e ON e.politician_id = p.id
"#;

/// Politician repository
pub struct PoliticianRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> PoliticianRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &PoliticianFilter,
        sort: Sort<PoliticianSort>,
        page: Pagination,
    ) -> Result<Paginated<PoliticianSummary>, DbError> {
        let q = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let sql = format!(
            r#"
            SELECT ps.*, COUNT(*) OVER() AS total FROM ({AGGREGATED}
                WHERE ($1::text IS NULL OR p.name ILIKE $1)
                  AND ($2::text IS NULL OR p.party = $2)
                  AND ($3::text IS NULL OR p.region = $3)
            ) ps
            ORDER BY {order}
            LIMIT $4 OFFSET $5
            "#,
            order = sort.order_by("ps"),
        );
        let (rows, total) = fetch_page(self.pool, page, |limit, offset| {
            sqlx::query(&sql)
                .bind(q.as_deref())
                .bind(filter.party.as_deref())
                .bind(filter.region.as_deref())
                .bind(limit)
                .bind(offset)
        })
        .await?;
        let items = rows
            .iter()
            .map(PoliticianSummary::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(page.wrap(items, total))
    }

    pub async fn get(&self, id: Uuid, viewer: Option<Uuid>) -> Result<PoliticianDetail, DbError> {
        sqlx::query_as::<_, PoliticianDetail>(&format!(
            r#"
            SELECT agg.*,
                (SELECT COUNT(*) FROM bookmarks b WHERE b.politician_id = agg.id) AS bookmark_count,
                ($2::uuid IS NOT NULL AND EXISTS(
                    SELECT 1 FROM bookmarks b WHERE b.politician_id = agg.id AND b.user_id = $2
                )) AS bookmarked
            FROM ({AGGREGATED} WHERE p.id = $1) agg
            "#
        ))
        .bind(id)
        .bind(viewer)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("politician", id))
    }

    /// Name lookup used by notifications and reports.
    pub async fn name(&self, id: Uuid) -> Result<String, DbError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT name FROM politicians WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(|(n,)| n)
            .ok_or_else(|| DbError::not_found("politician", id))
    }

    pub async fn create(&self, new: NewPolitician) -> Result<PoliticianDetail, DbError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO politicians (name, party, region, position, bio, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&new.name)
        .bind(new.party.as_deref())
        .bind(new.region.as_deref())
        .bind(new.position.as_deref())
        .bind(new.bio.as_deref())
        .bind(new.image_url.as_deref())
        .fetch_one(self.pool)
        .await?;

        tracing::info!(politician_id = %id, name = %new.name, "politician created");
        self.get(id, None).await
    }

    pub async fn update(&self, id: Uuid, patch: PoliticianPatch) -> Result<PoliticianDetail, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE politicians SET
                name = COALESCE($2, name),
                party = COALESCE($3, party),
                region = COALESCE($4, region),
                position = COALESCE($5, position),
                bio = COALESCE($6, bio),
                image_url = COALESCE($7, image_url),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.party.as_deref())
        .bind(patch.region.as_deref())
        .bind(patch.position.as_deref())
        .bind(patch.bio.as_deref())
        .bind(patch.image_url.as_deref())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("politician", id));
        }
        self.get(id, None).await
    }
}
