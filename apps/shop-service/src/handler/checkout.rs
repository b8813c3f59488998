//! # チェックアウトハンドラ
//!
//! - `POST /api/checkout` - ホスト型決済ページのセッションを作成し、URL を返す

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use storefront_shared::ApiResponse;

use super::extract::JsonBody;
use crate::{
    error::ShopError,
    usecase::{CheckoutInput, CheckoutItemInput, CheckoutUseCaseImpl},
};

pub struct CheckoutState {
    pub usecase: CheckoutUseCaseImpl,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemRequest {
    pub name:        String,
    /// 最小通貨単位
    pub unit_amount: i64,
    pub quantity:    i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items:          Vec<CheckoutItemRequest>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionDto {
    pub session_id: String,
    pub url:        String,
}

/// POST /api/checkout
#[tracing::instrument(skip_all, fields(items = req.items.len()))]
pub async fn create_checkout_session(
    State(state): State<Arc<CheckoutState>>,
    JsonBody(req): JsonBody<CheckoutRequest>,
) -> Result<impl IntoResponse, ShopError> {
    let session = state
        .usecase
        .create_session(CheckoutInput {
            items:          req
                .items
                .into_iter()
                .map(|item| CheckoutItemInput {
                    name:        item.name,
                    unit_amount: item.unit_amount,
                    quantity:    item.quantity,
                })
                .collect(),
            customer_email: req.customer_email,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(CheckoutSessionDto {
            session_id: session.id,
            url:        session.url,
        })),
    ))
}
