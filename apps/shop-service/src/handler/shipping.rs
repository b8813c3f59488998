//! # 配送ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/shipping/tracking/{tracking_number}` - 追跡照会
//! - `POST /api/shipping/labels` - 配送ラベル作成

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use storefront_domain::{
    order::UnverifiedShipping,
    shipping::{LabelFormat, ShipmentLabel, TrackingInfo, TrackingStatus},
};
use storefront_shared::ApiResponse;

use super::extract::{JsonBody, PathParam};
use crate::{
    error::ShopError,
    usecase::{CreateLabelInput, ShippingUseCaseImpl},
};

pub struct ShippingState {
    pub usecase: ShippingUseCaseImpl,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRequest {
    pub name:        Option<String>,
    pub line1:       Option<String>,
    pub line2:       Option<String>,
    pub city:        Option<String>,
    pub state:       Option<String>,
    pub postal_code: Option<String>,
    pub country:     Option<String>,
}

impl From<RecipientRequest> for UnverifiedShipping {
    fn from(req: RecipientRequest) -> Self {
        Self {
            name:        req.name,
            line1:       req.line1,
            line2:       req.line2,
            city:        req.city,
            state:       req.state,
            postal_code: req.postal_code,
            country:     req.country,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    pub recipient:    RecipientRequest,
    pub weight_grams: i64,
    /// `PDF` / `PNG` / `ZPL`。省略時は `PDF`
    #[serde(default)]
    pub label_format: Option<LabelFormat>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEventDto {
    pub occurred_at: String,
    pub description: String,
    pub location:    Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingDto {
    pub tracking_number:    String,
    pub status:             TrackingStatus,
    /// `YYYY-MM-DD`
    pub estimated_delivery: Option<String>,
    pub events:             Vec<TrackingEventDto>,
}

impl From<TrackingInfo> for TrackingDto {
    fn from(info: TrackingInfo) -> Self {
        Self {
            tracking_number:    info.tracking_number.to_string(),
            status:             info.status,
            estimated_delivery: info.estimated_delivery.map(|d| d.to_string()),
            events:             info
                .events
                .into_iter()
                .map(|event| TrackingEventDto {
                    occurred_at: event.occurred_at.to_rfc3339(),
                    description: event.description,
                    location:    event.location,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentLabelDto {
    pub tracking_number: String,
    pub label_format:    LabelFormat,
    /// Base64
    pub label_data:      String,
}

impl From<ShipmentLabel> for ShipmentLabelDto {
    fn from(label: ShipmentLabel) -> Self {
        Self {
            tracking_number: label.tracking_number.to_string(),
            label_format:    label.label_format,
            label_data:      label.label_data,
        }
    }
}

// --- ハンドラ ---

/// GET /api/shipping/tracking/{tracking_number}
#[tracing::instrument(skip_all, fields(%tracking_number))]
pub async fn get_tracking(
    State(state): State<Arc<ShippingState>>,
    PathParam(tracking_number): PathParam<String>,
) -> Result<impl IntoResponse, ShopError> {
    let info = state.usecase.track(&tracking_number).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(TrackingDto::from(info))),
    ))
}

/// POST /api/shipping/labels
#[tracing::instrument(skip_all, fields(weight_grams = req.weight_grams))]
pub async fn create_label(
    State(state): State<Arc<ShippingState>>,
    JsonBody(req): JsonBody<CreateLabelRequest>,
) -> Result<impl IntoResponse, ShopError> {
    let label = state
        .usecase
        .create_label(CreateLabelInput {
            recipient:    req.recipient.into(),
            weight_grams: req.weight_grams,
            label_format: req.label_format,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(ShipmentLabelDto::from(label))),
    ))
}
