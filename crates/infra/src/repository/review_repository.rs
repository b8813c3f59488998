//! # ReviewRepository
//!
//! レビューの永続化を担当するリポジトリ。
//!
//! ユーザーごとの票は `user_votes` JSONB カラムに `{"<userId>": "like"}` の形で保存する。
//! 更新は `version` 列による楽観的ロックで直列化する。

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, types::Json};
use storefront_domain::{
    review::{
        ProductName,
        Rating,
        Review,
        ReviewContent,
        ReviewId,
        ReviewRecord,
        ReviewTitle,
        UserKey,
        Vote,
    },
    value_objects::Version,
};
use uuid::Uuid;

use crate::error::InfraError;

/// レビューリポジトリトレイト
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// 新規レビューを挿入する
    async fn insert(&self, review: &Review) -> Result<(), InfraError>;

    /// 楽観的ロック付きでカウンタと票を更新する
    ///
    /// `review` は `version` を進めた後の状態、`expected_version` は読み込み時の版。
    ///
    /// # Errors
    ///
    /// 保存済みの版が `expected_version` と異なる場合は Conflict。
    async fn update_with_version_check(
        &self,
        review: &Review,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, InfraError>;

    /// 商品名が完全一致するレビューを新しい順に返す
    async fn find_by_product(&self, product_name: &ProductName)
    -> Result<Vec<Review>, InfraError>;

    /// 全レビューを新しい順に返す
    async fn find_all(&self) -> Result<Vec<Review>, InfraError>;
}

/// `reviews` テーブルの行
#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id:           Uuid,
    title:        String,
    content:      String,
    rating:       i16,
    product_name: String,
    thumbs_up:    i32,
    thumbs_down:  i32,
    user_votes:   Json<BTreeMap<String, Vote>>,
    version:      i32,
    created_at:   DateTime<Utc>,
    updated_at:   DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = InfraError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupted = |e: storefront_domain::DomainError| {
            InfraError::unexpected(format!("reviews 行 {id} が不正です: {e}"))
        };

        let user_votes = row
            .user_votes
            .0
            .into_iter()
            .map(|(key, vote)| UserKey::new(key).map(|k| (k, vote)))
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map_err(corrupted)?;

        let counter = |value: i32, column: &str| {
            u32::try_from(value).map_err(|_| {
                InfraError::unexpected(format!("reviews.{column} が負の値です: {value}"))
            })
        };

        Review::from_db(ReviewRecord {
            id: ReviewId::from_uuid(id),
            title: ReviewTitle::new(row.title).map_err(corrupted)?,
            content: ReviewContent::new(row.content).map_err(corrupted)?,
            rating: Rating::new(i64::from(row.rating)).map_err(corrupted)?,
            product_name: ProductName::new(row.product_name).map_err(corrupted)?,
            thumbs_up: counter(row.thumbs_up, "thumbs_up")?,
            thumbs_down: counter(row.thumbs_down, "thumbs_down")?,
            user_votes,
            version: Version::try_from(row.version).map_err(corrupted)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(corrupted)
    }
}

/// ドメインのカウンタを INTEGER 列の値に変換する
fn counter_column(value: u32) -> Result<i32, InfraError> {
    i32::try_from(value)
        .map_err(|_| InfraError::invalid_input(format!("カウンタが上限を超えています: {value}")))
}

fn user_votes_column(review: &Review) -> Json<BTreeMap<&str, Vote>> {
    Json(
        review
            .user_votes()
            .iter()
            .map(|(user, vote)| (user.as_str(), *vote))
            .collect(),
    )
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id, title, content, rating, product_name,
        thumbs_up, thumbs_down, user_votes, version,
        created_at, updated_at
    FROM reviews
"#;

/// PostgreSQL 実装の ReviewRepository
#[derive(Debug, Clone)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(review_id = %review.id()))]
    async fn insert(&self, review: &Review) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, title, content, rating, product_name,
                thumbs_up, thumbs_down, user_votes, version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(review.id().as_uuid())
        .bind(review.title().as_str())
        .bind(review.content().as_str())
        .bind(i16::from(review.rating().as_u8()))
        .bind(review.product_name().as_str())
        .bind(counter_column(review.thumbs_up())?)
        .bind(counter_column(review.thumbs_down())?)
        .bind(user_votes_column(review))
        .bind(review.version().as_i32())
        .bind(review.created_at())
        .bind(review.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(review_id = %review.id(), %expected_version)
    )]
    async fn update_with_version_check(
        &self,
        review: &Review,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let result = sqlx::query(
            r#"
            UPDATE reviews SET
                thumbs_up = $1,
                thumbs_down = $2,
                user_votes = $3,
                version = $4,
                updated_at = $5
            WHERE id = $6 AND version = $7
            "#,
        )
        .bind(counter_column(review.thumbs_up())?)
        .bind(counter_column(review.thumbs_down())?)
        .bind(user_votes_column(review))
        .bind(review.version().as_i32())
        .bind(review.updated_at())
        .bind(review.id().as_uuid())
        .bind(expected_version.as_i32())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict("Review", review.id().to_string()));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &ReviewId) -> Result<Option<Review>, InfraError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Review::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(product_name = %product_name))]
    async fn find_by_product(
        &self,
        product_name: &ProductName,
    ) -> Result<Vec<Review>, InfraError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{SELECT_COLUMNS} WHERE product_name = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(product_name.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<Review>, InfraError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Review::try_from).collect()
    }
}
