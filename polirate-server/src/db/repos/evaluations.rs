//! AI evaluation scores per politician and category

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use polirate_core::{overall_score, EvaluationCategory, EvaluationScore};

use super::super::DbError;

/// One category score
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Evaluation {
    pub category: String,
    pub score: f64,
    pub summary: Option<String>,
    pub model: String,
    pub evaluated_at: DateTime<Utc>,
}

/// All category scores with their mean
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub politician_id: Uuid,
    pub overall: Option<f64>,
    pub categories: Vec<Evaluation>,
}

/// Validated input for one category
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    pub category: EvaluationCategory,
    pub score: EvaluationScore,
    pub summary: Option<String>,
}

/// Evaluation repository
pub struct EvaluationRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EvaluationRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn for_politician(&self, politician_id: Uuid) -> Result<EvaluationSummary, DbError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM politicians WHERE id = $1)")
                .bind(politician_id)
                .fetch_one(self.pool)
                .await?;
        if !exists {
            return Err(DbError::not_found("politician", politician_id));
        }

        let categories: Vec<Evaluation> = sqlx::query_as(
            r#"
            SELECT category, score, summary, model, evaluated_at
            FROM politician_evaluations
            WHERE politician_id = $1
            ORDER BY category
            "#,
        )
        .bind(politician_id)
        .fetch_all(self.pool)
        .await?;

        let scores: Vec<f64> = categories.iter().map(|c| c.score).collect();
        Ok(EvaluationSummary {
            politician_id,
            overall: overall_score(&scores),
            categories,
        })
    }

    /// Replace the given categories' scores. Categories not listed keep
    /// their previous score.
    pub async fn upsert(
        &self,
        politician_id: Uuid,
        model: &str,
        inputs: &[EvaluationInput],
    ) -> Result<EvaluationSummary, DbError> {
        let mut tx = self.pool.begin().await?;

        for input in inputs {
            sqlx::query(
                r#"
                INSERT INTO politician_evaluations (politician_id, category, score, summary, model)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT ON CONSTRAINT politician_evaluations_pkey DO UPDATE
                    SET score = EXCLUDED.score,
                        summary = EXCLUDED.summary,
                        model = EXCLUDED.model,
                        evaluated_at = NOW()
                "#,
            )
            .bind(politician_id)
            .bind(input.category.as_str())
            .bind(input.score.value())
            .bind(input.summary.as_deref())
            .bind(model)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(%politician_id, model, categories = inputs.len(), "evaluation stored");

        self.for_politician(politician_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires database"]
    async fn upsert_and_average() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let (id,): (Uuid,) =
            sqlx::query_as("INSERT INTO politicians (name) VALUES ('Evaluated') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();

        let repo = EvaluationRepo::new(&pool);
        let inputs = [
            EvaluationInput {
                category: EvaluationCategory::Integrity,
                score: EvaluationScore::new(80.0).unwrap(),
                summary: None,
            },
            EvaluationInput {
                category: EvaluationCategory::Competence,
                score: EvaluationScore::new(65.0).unwrap(),
                summary: Some("solid".into()),
            },
        ];
        let summary = repo.upsert(id, "model-a", &inputs).await.unwrap();
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.overall, Some(72.5));

        // Re-scoring one category replaces it
        let summary = repo
            .upsert(
                id,
                "model-b",
                &[EvaluationInput {
                    category: EvaluationCategory::Integrity,
                    score: EvaluationScore::new(90.0).unwrap(),
                    summary: None,
                }],
            )
            .await
            .unwrap();
        assert_eq!(summary.categories.len(), 2);
        assert_eq!(summary.overall, Some(77.5));
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn unknown_politician() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = crate::db::create_pool(&url).await.unwrap();
        crate::db::migrations::run(&pool).await.unwrap();

        let err = EvaluationRepo::new(&pool)
            .for_politician(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
