//! # 通知
//!
//! 注文に関するメール通知のドメインモデル。
//!
//! | 型 | 用途 |
//! |---|------|
//! | [`OrderNotification`] | 通知イベント（購入者宛て確認、店舗宛て新規注文、配送先不備） |
//! | [`EmailMessage`] | テンプレート描画後のメール。`NotificationSender` に渡される |
//!
//! 通知の送信失敗は Webhook の応答に影響しない（fire-and-forget）。
//! メール本文の生成はサービス側の `TemplateRenderer` が担う。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::order::ShippingDetails;

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

/// 通知イベント種別
///
/// テンプレート名とログの `event_type` に使う。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum NotificationEventType {
    /// 購入者への注文確認
    OrderConfirmation,
    /// 店舗オーナーへの新規注文
    NewOrder,
    /// 店舗オーナーへの配送先不備アラート
    ShippingAttention,
}

/// メールメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to:        String,
    pub subject:   String,
    pub html_body: String,
    pub text_body: String,
}

/// 注文通知イベント
#[derive(Debug, Clone)]
pub enum OrderNotification {
    /// 配送先が有効な注文 → 購入者に送信
    OrderConfirmation {
        order_id:       String,
        customer_email: String,
        customer_name:  Option<String>,
        /// 表示用に整形済みの合計金額（例: `"19.99 USD"`）
        amount:         String,
        shipping:       ShippingDetails,
    },
    /// 配送先が有効な注文 → 店舗オーナーに送信
    NewOrder {
        order_id:       String,
        customer_email: Option<String>,
        amount:         String,
        shipping:       ShippingDetails,
        owner_email:    String,
    },
    /// 配送先に不備がある注文 → 店舗オーナーに送信
    ShippingAttention {
        order_id:       String,
        customer_email: Option<String>,
        amount:         String,
        /// 不備の説明（表示用）
        problems:       Vec<String>,
        owner_email:    String,
    },
}

impl OrderNotification {
    pub fn event_type(&self) -> NotificationEventType {
        match self {
            Self::OrderConfirmation { .. } => NotificationEventType::OrderConfirmation,
            Self::NewOrder { .. } => NotificationEventType::NewOrder,
            Self::ShippingAttention { .. } => NotificationEventType::ShippingAttention,
        }
    }

    /// 受信者のメールアドレス
    pub fn recipient_email(&self) -> &str {
        match self {
            Self::OrderConfirmation { customer_email, .. } => customer_email,
            Self::NewOrder { owner_email, .. } | Self::ShippingAttention { owner_email, .. } => {
                owner_email
            }
        }
    }

    /// 決済セッション ID
    pub fn order_id(&self) -> &str {
        match self {
            Self::OrderConfirmation { order_id, .. }
            | Self::NewOrder { order_id, .. }
            | Self::ShippingAttention { order_id, .. } => order_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(NotificationEventType::OrderConfirmation, "order_confirmation")]
    #[case(NotificationEventType::NewOrder, "new_order")]
    #[case(NotificationEventType::ShippingAttention, "shipping_attention")]
    fn test_イベント種別の文字列変換(
        #[case] event_type: NotificationEventType,
        #[case] expected: &str,
    ) {
        assert_eq!(event_type.to_string(), expected);
        assert_eq!(NotificationEventType::from_str(expected).unwrap(), event_type);
    }

    #[test]
    fn test_配送先不備の通知はオーナー宛て() {
        let notification = OrderNotification::ShippingAttention {
            order_id:       "cs_test_1".to_string(),
            customer_email: Some("buyer@example.com".to_string()),
            amount:         "10.00 USD".to_string(),
            problems:       vec!["郵便番号がありません".to_string()],
            owner_email:    "owner@example.com".to_string(),
        };

        assert_eq!(notification.recipient_email(), "owner@example.com");
        assert_eq!(notification.order_id(), "cs_test_1");
        assert_eq!(
            notification.event_type(),
            NotificationEventType::ShippingAttention
        );
    }
}
