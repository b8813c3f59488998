//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! - 各ハンドラはサブモジュールに配置し、ここで re-export する
//! - ハンドラは DTO の変換だけを行い、ロジックはユースケースに委譲する
//! - 成功レスポンスは `{ "data": ... }`、エラーは RFC 9457 Problem Details

pub mod checkout;
pub mod extract;
pub mod health;
pub mod review;
pub mod shipping;
pub mod webhook;

pub use checkout::{CheckoutState, create_checkout_session};
pub use health::{ReadinessState, health_check, readiness_check};
pub use review::{
    ReviewState,
    create_review,
    get_review,
    increment_review,
    list_reviews,
    vote_review,
};
pub use shipping::{ShippingState, create_label, get_tracking};
pub use webhook::{WebhookState, receive_payment_webhook};
