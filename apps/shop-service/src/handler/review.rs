//! # レビューハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/reviews` - レビュー投稿
//! - `GET /api/reviews` - 一覧（`?productName=` で絞り込み）
//! - `GET /api/reviews/{review_id}` - 詳細
//! - `POST /api/reviews/{review_id}/vote` - 投票台帳を通した投票
//! - `POST /api/reviews/{review_id}/increment` - カウンタの直接加算

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use storefront_domain::review::{Review, ReviewId, UserKey, Vote};
use storefront_shared::ApiResponse;
use uuid::Uuid;

use super::extract::{JsonBody, PathParam};
use crate::{
    error::ShopError,
    usecase::{CreateReviewInput, IncrementInput, ReviewUseCaseImpl, VoteInput},
};

/// レビュー API の共有状態
pub struct ReviewState {
    pub usecase: ReviewUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub title:        String,
    pub content:      String,
    pub rating:       i64,
    pub product_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReviewsQuery {
    pub product_name: Option<String>,
}

/// 投票リクエスト
///
/// `action` は文字列のまま受け取り、ユースケースで検証する（不正値は 400）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub user_id: String,
    pub action:  String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementRequest {
    pub vote_type: String,
}

/// レビュー DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDto {
    pub id:           Uuid,
    pub title:        String,
    pub content:      String,
    pub rating:       u8,
    pub product_name: String,
    pub thumbs_up:    u32,
    pub thumbs_down:  u32,
    pub user_votes:   BTreeMap<String, Vote>,
    pub created_at:   String,
    pub updated_at:   String,
}

impl From<&Review> for ReviewDto {
    fn from(review: &Review) -> Self {
        Self {
            id:           *review.id().as_uuid(),
            title:        review.title().to_string(),
            content:      review.content().to_string(),
            rating:       review.rating().as_u8(),
            product_name: review.product_name().to_string(),
            thumbs_up:    review.thumbs_up(),
            thumbs_down:  review.thumbs_down(),
            user_votes:   review
                .user_votes()
                .iter()
                .map(|(user, vote)| (user.to_string(), *vote))
                .collect(),
            created_at:   review.created_at().to_rfc3339(),
            updated_at:   review.updated_at().to_rfc3339(),
        }
    }
}

/// 投票結果 DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResultDto {
    pub thumbs_up:   u32,
    pub thumbs_down: u32,
    /// 操作後の投票者の票（取り消し後は `null`）
    pub user_vote:   Option<Vote>,
}

/// カウンタ DTO
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersDto {
    pub thumbs_up:   u32,
    pub thumbs_down: u32,
}

// --- ハンドラ ---

/// POST /api/reviews
#[tracing::instrument(skip_all, fields(product_name = %req.product_name))]
pub async fn create_review(
    State(state): State<Arc<ReviewState>>,
    JsonBody(req): JsonBody<CreateReviewRequest>,
) -> Result<impl IntoResponse, ShopError> {
    let review = state
        .usecase
        .create_review(CreateReviewInput {
            title:        req.title,
            content:      req.content,
            rating:       req.rating,
            product_name: req.product_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ReviewDto::from(&review))),
    ))
}

/// GET /api/reviews
///
/// `productName` が空文字列の場合は絞り込まない。
#[tracing::instrument(skip_all)]
pub async fn list_reviews(
    State(state): State<Arc<ReviewState>>,
    Query(query): Query<ListReviewsQuery>,
) -> Result<impl IntoResponse, ShopError> {
    let product_name = query.product_name.filter(|name| !name.trim().is_empty());
    let reviews = state.usecase.list_reviews(product_name).await?;

    let items: Vec<ReviewDto> = reviews.iter().map(ReviewDto::from).collect();
    Ok((StatusCode::OK, Json(ApiResponse::new(items))))
}

/// GET /api/reviews/{review_id}
#[tracing::instrument(skip_all, fields(%review_id))]
pub async fn get_review(
    State(state): State<Arc<ReviewState>>,
    PathParam(review_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ShopError> {
    let review = state
        .usecase
        .get_review(&ReviewId::from_uuid(review_id))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(ReviewDto::from(&review))),
    ))
}

/// POST /api/reviews/{review_id}/vote
#[tracing::instrument(skip_all, fields(%review_id, action = %req.action))]
pub async fn vote_review(
    State(state): State<Arc<ReviewState>>,
    PathParam(review_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<VoteRequest>,
) -> Result<impl IntoResponse, ShopError> {
    let user = req.user_id.clone();
    let review = state
        .usecase
        .vote(VoteInput {
            review_id: ReviewId::from_uuid(review_id),
            user_id:   req.user_id,
            action:    req.action,
        })
        .await?;
    let user_vote = review.vote_of(&UserKey::new(user)?);

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(VoteResultDto {
            thumbs_up: review.thumbs_up(),
            thumbs_down: review.thumbs_down(),
            user_vote,
        })),
    ))
}

/// POST /api/reviews/{review_id}/increment
#[tracing::instrument(skip_all, fields(%review_id, vote_type = %req.vote_type))]
pub async fn increment_review(
    State(state): State<Arc<ReviewState>>,
    PathParam(review_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<IncrementRequest>,
) -> Result<impl IntoResponse, ShopError> {
    let review = state
        .usecase
        .increment(IncrementInput {
            review_id: ReviewId::from_uuid(review_id),
            vote_type: req.vote_type,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(CountersDto {
            thumbs_up:   review.thumbs_up(),
            thumbs_down: review.thumbs_down(),
        })),
    ))
}
