//! # ルーター構築
//!
//! 依存コンポーネントを受け取り、全エンドポイントとミドルウェアを組み立てる。
//! `main` とルーターテストの両方から使う。
//!
//! ミドルウェアの順序（外側から）:
//!
//! ```text
//! SetRequestId → TraceLayer → PropagateRequestId → CanonicalLogLine → handler
//! ```

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderName, Request},
    routing::{get, post},
};
use sqlx::PgPool;
use storefront_domain::{clock::Clock, notification::NotificationError};
use storefront_infra::{
    notification::NotificationSender,
    payment::PaymentGateway,
    repository::ReviewRepository,
    shipping::ShippingCarrier,
};
use storefront_shared::{canonical_log::CanonicalLogLineLayer, observability::REQUEST_ID_HEADER};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    config::ShopConfig,
    handler::{
        CheckoutState,
        ReadinessState,
        ReviewState,
        ShippingState,
        WebhookState,
        create_checkout_session,
        create_label,
        create_review,
        get_review,
        get_tracking,
        health_check,
        increment_review,
        list_reviews,
        readiness_check,
        receive_payment_webhook,
        vote_review,
    },
    usecase::{
        CheckoutUseCaseImpl,
        NotificationService,
        PaymentWebhookUseCaseImpl,
        ReviewUseCaseImpl,
        ShippingUseCaseImpl,
        TemplateRenderer,
    },
};

/// 外部システムとの境界
pub struct AppDependencies {
    pub review_repository:   Arc<dyn ReviewRepository>,
    pub payment_gateway:     Arc<dyn PaymentGateway>,
    pub notification_sender: Arc<dyn NotificationSender>,
    pub shipping_carrier:    Arc<dyn ShippingCarrier>,
    pub clock:               Arc<dyn Clock>,
    /// Readiness Check 用
    pub pool:                PgPool,
}

/// ルーター構築に必要な設定値
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub webhook_secret: String,
    pub currency:       String,
    pub owner_email:    String,
}

impl From<&ShopConfig> for AppSettings {
    fn from(config: &ShopConfig) -> Self {
        Self {
            webhook_secret: config.payment.webhook_secret.clone(),
            currency:       config.payment.currency.clone(),
            owner_email:    config.notification.owner_email.clone(),
        }
    }
}

/// ルーターを構築する
///
/// メールテンプレートの登録に失敗した場合はエラーを返す。
pub fn build_router(
    deps: AppDependencies,
    settings: AppSettings,
) -> Result<Router, NotificationError> {
    let notification = Arc::new(NotificationService::new(
        deps.notification_sender,
        TemplateRenderer::new()?,
    ));

    let readiness_state = Arc::new(ReadinessState { pool: deps.pool });
    let review_state = Arc::new(ReviewState {
        usecase: ReviewUseCaseImpl::new(deps.review_repository, deps.clock.clone()),
    });
    let checkout_state = Arc::new(CheckoutState {
        usecase: CheckoutUseCaseImpl::new(deps.payment_gateway, settings.currency),
    });
    let webhook_state = Arc::new(WebhookState {
        usecase: PaymentWebhookUseCaseImpl::new(
            settings.webhook_secret,
            settings.owner_email,
            notification,
            deps.clock,
        ),
    });
    let shipping_state = Arc::new(ShippingState {
        usecase: ShippingUseCaseImpl::new(deps.shipping_carrier),
    });

    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .with_state(readiness_state)
        // レビュー API
        .route("/api/reviews", post(create_review).get(list_reviews))
        .route("/api/reviews/{review_id}", get(get_review))
        .route("/api/reviews/{review_id}/vote", post(vote_review))
        .route("/api/reviews/{review_id}/increment", post(increment_review))
        .with_state(review_state)
        // 決済 API
        .route("/api/checkout", post(create_checkout_session))
        .with_state(checkout_state)
        .route("/api/webhooks/payment", post(receive_payment_webhook))
        .with_state(webhook_state)
        // 配送 API
        .route(
            "/api/shipping/tracking/{tracking_number}",
            get(get_tracking),
        )
        .route("/api/shipping/labels", post(create_label))
        .with_state(shipping_state)
        .layer(CanonicalLogLineLayer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid));

    Ok(app)
}

/// リクエストスパンに `request_id` を載せる
fn make_request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
