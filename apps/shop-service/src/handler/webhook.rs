//! # 決済 Webhook ハンドラ
//!
//! - `POST /api/webhooks/payment` - 決済プロバイダからのイベント受信
//!
//! 署名は生のボディに対して計算されるため、JSON extractor を使わず `Bytes` で受け取る。

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use storefront_infra::payment::SIGNATURE_HEADER;
use storefront_shared::ApiResponse;

use crate::{error::ShopError, usecase::PaymentWebhookUseCaseImpl};

pub struct WebhookState {
    pub usecase: PaymentWebhookUseCaseImpl,
}

#[derive(Debug, Serialize)]
pub struct WebhookReceivedDto {
    pub received: bool,
}

/// POST /api/webhooks/payment
///
/// 署名が有効で JSON として読めれば、イベントの処理結果にかかわらず 200 を返す。
#[tracing::instrument(skip_all, fields(body_len = body.len()))]
pub async fn receive_payment_webhook(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ShopError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.usecase.handle(signature, &body).await?;
    tracing::debug!(?outcome, "Webhook を処理しました");

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(WebhookReceivedDto { received: true })),
    ))
}
