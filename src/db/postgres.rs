use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Actor, AgeCondition, BusinessContext, CatalogItem, Category, InteractionEvent,
        InteractionKind, InteractionMetadata, InterestKey, InterestScore, RegionRef, RegionScope,
        ScoreBreakdown,
    },
    services::{
        collaborators::{ActorDirectory, CatalogSource, ScoreStore},
        ledger::{InteractionLedger, RetentionPolicy},
    },
};

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the schema in `migrations/`
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL implementation of every collaborator interface
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_u32(value: Option<i32>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn to_u8(value: Option<i16>) -> Option<u8> {
    value.and_then(|v| u8::try_from(v).ok())
}

fn age_condition(min: Option<i32>, max: Option<i32>, text: Option<String>) -> AgeCondition {
    match (to_u32(min), to_u32(max), text) {
        (Some(min), Some(max), _) => AgeCondition::Range { min, max },
        (None, Some(age), _) => AgeCondition::AtMost { age },
        (Some(age), None, _) => AgeCondition::AtLeast { age },
        (None, None, Some(text)) if !text.trim().is_empty() => AgeCondition::Text { text },
        _ => AgeCondition::Unspecified,
    }
}

fn event_from_row(row: &PgRow) -> AppResult<InteractionEvent> {
    let kind: String = row.try_get("kind")?;
    let kind = kind.parse::<InteractionKind>().map_err(AppError::Internal)?;

    Ok(InteractionEvent {
        id: row.try_get("id")?,
        actor_id: row.try_get("actor_id")?,
        item_id: row.try_get("item_id")?,
        kind,
        metadata: InteractionMetadata {
            duration_seconds: to_u32(row.try_get("duration_seconds")?),
            scroll_depth: to_u8(row.try_get("scroll_depth")?),
            rating: to_u8(row.try_get("rating")?),
        },
        created_at: row.try_get("created_at")?,
    })
}

fn item_from_row(row: &PgRow, regions: Vec<RegionRef>) -> AppResult<CatalogItem> {
    let category: String = row.try_get("category")?;
    let category = category.parse::<Category>().map_err(AppError::Internal)?;
    let nationwide: bool = row.try_get("nationwide")?;

    let mut scope = RegionScope::from_refs(regions);
    scope.nationwide |= nationwide;

    Ok(CatalogItem {
        id: row.try_get("id")?,
        category,
        title: row.try_get("title")?,
        regions: scope,
        age_condition: age_condition(
            row.try_get("age_min")?,
            row.try_get("age_max")?,
            row.try_get("age_text")?,
        ),
        created_at: row.try_get("created_at")?,
    })
}

impl PgStore {
    async fn regions_for(&self, item_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<RegionRef>>> {
        let rows = sqlx::query(
            "SELECT item_id, province_name, district_name
             FROM catalog_item_regions
             WHERE item_id = ANY($1)",
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut regions: HashMap<Uuid, Vec<RegionRef>> = HashMap::new();
        for row in rows {
            let item_id: Uuid = row.try_get("item_id")?;
            regions.entry(item_id).or_default().push(RegionRef::new(
                row.try_get("province_name")?,
                row.try_get("district_name")?,
            ));
        }
        Ok(regions)
    }

    async fn items_from_rows(&self, rows: Vec<PgRow>) -> AppResult<Vec<CatalogItem>> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut regions = self.regions_for(&ids).await?;

        rows.iter()
            .zip(ids)
            .map(|(row, id)| item_from_row(row, regions.remove(&id).unwrap_or_default()))
            .collect()
    }
}

#[async_trait::async_trait]
impl InteractionLedger for PgStore {
    async fn append(&self, event: InteractionEvent) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO interaction_events
                (id, actor_id, item_id, kind, duration_seconds, scroll_depth, rating, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(event.id)
        .bind(event.actor_id)
        .bind(event.item_id)
        .bind(event.kind.as_str())
        .bind(event.metadata.duration_seconds.map(|d| d.min(i32::MAX as u32) as i32))
        .bind(event.metadata.scroll_depth.map(i16::from))
        .bind(event.metadata.rating.map(i16::from))
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn events_for(&self, actor_id: Uuid, item_id: Uuid) -> AppResult<Vec<InteractionEvent>> {
        let rows = sqlx::query(
            "SELECT id, actor_id, item_id, kind, duration_seconds, scroll_depth, rating, created_at
             FROM interaction_events
             WHERE actor_id = $1 AND item_id = $2",
        )
        .bind(actor_id)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }

    async fn compact(
        &self,
        actor_id: Uuid,
        item_id: Uuid,
        policy: RetentionPolicy,
    ) -> AppResult<usize> {
        let keep = match policy {
            RetentionPolicy::KeepAll => return Ok(0),
            RetentionPolicy::KeepLatest(keep) => i64::try_from(keep).unwrap_or(i64::MAX),
        };

        let result = sqlx::query(
            "DELETE FROM interaction_events
             WHERE actor_id = $1 AND item_id = $2
               AND id NOT IN (
                   SELECT id FROM interaction_events
                   WHERE actor_id = $1 AND item_id = $2
                   ORDER BY created_at DESC, id DESC
                   LIMIT $3
               )",
        )
        .bind(actor_id)
        .bind(item_id)
        .bind(keep)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as usize)
    }
}

#[async_trait::async_trait]
impl ScoreStore for PgStore {
    async fn get_interest(&self, key: &InterestKey) -> AppResult<Option<InterestScore>> {
        let row = sqlx::query(
            "SELECT view_score, engagement_score, time_score, last_calculated_at
             FROM interest_scores
             WHERE actor_id = $1 AND business_context_id = $2 AND item_id = $3",
        )
        .bind(key.actor_id)
        .bind(key.business_context_id)
        .bind(key.item_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // The total column is derived data; rebuild it from the sub-scores
        let breakdown = ScoreBreakdown {
            view_score: row.try_get("view_score")?,
            engagement_score: row.try_get("engagement_score")?,
            time_score: row.try_get("time_score")?,
        };
        let calculated_at: DateTime<Utc> = row.try_get("last_calculated_at")?;

        Ok(Some(InterestScore::new(*key, breakdown, calculated_at)))
    }

    async fn upsert_interest(&self, score: InterestScore) -> AppResult<()> {
        let key = score.key();
        sqlx::query(
            "INSERT INTO interest_scores
                (actor_id, business_context_id, item_id,
                 view_score, engagement_score, time_score, total_score, last_calculated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (actor_id, business_context_id, item_id) DO UPDATE SET
                view_score = EXCLUDED.view_score,
                engagement_score = EXCLUDED.engagement_score,
                time_score = EXCLUDED.time_score,
                total_score = EXCLUDED.total_score,
                last_calculated_at = EXCLUDED.last_calculated_at",
        )
        .bind(key.actor_id)
        .bind(key.business_context_id)
        .bind(key.item_id)
        .bind(score.view_score())
        .bind(score.engagement_score())
        .bind(score.time_score())
        .bind(score.total_score())
        .bind(score.last_calculated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogSource for PgStore {
    async fn load_candidate_items(
        &self,
        limit: usize,
        category: Option<Category>,
    ) -> AppResult<Vec<CatalogItem>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            "SELECT id, category, title, nationwide, age_min, age_max, age_text, created_at
             FROM catalog_items
             WHERE ($1::TEXT IS NULL OR category = $1)
             ORDER BY created_at DESC, id
             LIMIT $2",
        )
        .bind(category.map(|c| c.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.items_from_rows(rows).await
    }

    async fn find_item(&self, item_id: Uuid) -> AppResult<Option<CatalogItem>> {
        let rows = sqlx::query(
            "SELECT id, category, title, nationwide, age_min, age_max, age_text, created_at
             FROM catalog_items
             WHERE id = $1",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(self.items_from_rows(rows).await?.into_iter().next())
    }
}

#[async_trait::async_trait]
impl ActorDirectory for PgStore {
    async fn resolve_actor(&self, actor_id: Uuid) -> AppResult<Option<Actor>> {
        let row = sqlx::query(
            "SELECT a.id, a.birth_date,
                    b.id AS business_context_id, b.province_name, b.district_name, b.industry
             FROM actors a
             JOIN business_contexts b ON b.id = a.business_context_id
             WHERE a.id = $1",
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let birth_date: Option<NaiveDate> = row.try_get("birth_date")?;
        Ok(Some(Actor {
            id: row.try_get("id")?,
            birth_date,
            business_context: BusinessContext {
                id: row.try_get("business_context_id")?,
                province_name: row.try_get("province_name")?,
                district_name: row.try_get("district_name")?,
                industry: row.try_get("industry")?,
            },
        }))
    }
}
