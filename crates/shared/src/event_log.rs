//! # ビジネスイベントログ
//!
//! 投票、決済、通知、配送といった業務上の出来事を構造化ログとして出力する。
//!
//! [`log_business_event!`] は `event.kind = "business_event"` を自動付与するため、
//! JSON ログから `jq 'select(.["event.kind"] == "business_event")'` で抽出できる。
//!
//! フィールド名はドット記法（`event.category`、`error.kind`）を使う。
//! JSON 出力ではフラットなキーになる。

/// ビジネスイベントを INFO レベルで出力する
///
/// 慣例として以下のフィールドを付与する:
///
/// - `event.category`: [`event::category`]
/// - `event.action`: [`event::action`]
/// - `event.entity_type` / `event.entity_id`: 対象エンティティ
/// - `event.result`: [`event::result`]
///
/// ```ignore
/// use storefront_shared::{event_log::event, log_business_event};
///
/// log_business_event!(
///     event.category = event::category::REVIEW,
///     event.action = event::action::REVIEW_VOTED,
///     event.entity_type = event::entity_type::REVIEW,
///     event.entity_id = %review_id,
///     event.result = event::result::SUCCESS,
///     "レビューに投票しました"
/// );
/// ```
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    pub mod category {
        pub const REVIEW: &str = "review";
        pub const PAYMENT: &str = "payment";
        pub const NOTIFICATION: &str = "notification";
        pub const SHIPPING: &str = "shipping";
    }

    pub mod action {
        // レビュー
        pub const REVIEW_CREATED: &str = "review.created";
        pub const REVIEW_VOTED: &str = "review.voted";
        pub const REVIEW_INCREMENTED: &str = "review.incremented";

        // 決済
        pub const CHECKOUT_SESSION_CREATED: &str = "checkout.session_created";
        pub const WEBHOOK_RECEIVED: &str = "webhook.received";
        pub const WEBHOOK_REJECTED: &str = "webhook.rejected";
        pub const ORDER_SHIPPING_INVALID: &str = "order.shipping_invalid";

        // 通知
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";

        // 配送
        pub const TRACKING_FETCHED: &str = "shipping.tracking_fetched";
        pub const LABEL_CREATED: &str = "shipping.label_created";
    }

    pub mod entity_type {
        pub const REVIEW: &str = "review";
        pub const CHECKOUT_SESSION: &str = "checkout_session";
        pub const PAYMENT_EVENT: &str = "payment_event";
        pub const EMAIL: &str = "email";
        pub const SHIPMENT: &str = "shipment";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
///
/// `tracing::error!` に `error.category` と `error.kind` を直接付与して使う。
pub mod error {
    pub mod category {
        /// データベースなど自前のインフラ
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 決済プロバイダ、配送キャリア、メール送信先
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const INTERNAL: &str = "internal";
        pub const PAYMENT_PROVIDER: &str = "payment_provider";
        pub const SHIPPING_CARRIER: &str = "shipping_carrier";
        pub const EMAIL_DELIVERY: &str = "email_delivery";
    }
}
