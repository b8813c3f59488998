//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールを HTML/plaintext 両形式で生成する。
//!
//! - テンプレートは `include_str!` でバイナリに埋め込む
//! - 件名は `[Storefront] {種別}: {注文 ID}` の形式
//! - `.html` のテンプレートは tera の自動エスケープが効く

use storefront_domain::notification::{EmailMessage, NotificationError, OrderNotification};
use tera::{Context, Tera};

/// 件名の接頭辞
const SUBJECT_PREFIX: &str = "[Storefront]";

/// テンプレートレンダラー
///
/// `OrderNotification` から `EmailMessage` を生成する。
pub struct TemplateRenderer {
    engine: Tera,
}

impl TemplateRenderer {
    /// 埋め込みテンプレートを登録したレンダラーを作成する
    pub fn new() -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "order_confirmation.html",
                    include_str!("../../../templates/notifications/order_confirmation.html"),
                ),
                (
                    "order_confirmation.txt",
                    include_str!("../../../templates/notifications/order_confirmation.txt"),
                ),
                (
                    "new_order.html",
                    include_str!("../../../templates/notifications/new_order.html"),
                ),
                (
                    "new_order.txt",
                    include_str!("../../../templates/notifications/new_order.txt"),
                ),
                (
                    "shipping_attention.html",
                    include_str!("../../../templates/notifications/shipping_attention.html"),
                ),
                (
                    "shipping_attention.txt",
                    include_str!("../../../templates/notifications/shipping_attention.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine })
    }

    /// 通知イベントからメールメッセージを生成する
    pub fn render(&self, notification: &OrderNotification) -> Result<EmailMessage, NotificationError> {
        let (subject, context) = build_template_params(notification);
        let template_name: &str = notification.event_type().into();

        let html_body = self
            .engine
            .render(&format!("{template_name}.html"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(&format!("{template_name}.txt"), &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: notification.recipient_email().to_string(),
            subject,
            html_body,
            text_body,
        })
    }
}

/// 件名とテンプレートコンテキストを構築する
fn build_template_params(notification: &OrderNotification) -> (String, Context) {
    let order_id = notification.order_id();

    let mut context = Context::new();
    context.insert("order_id", order_id);

    let subject = match notification {
        OrderNotification::OrderConfirmation {
            customer_name,
            amount,
            shipping,
            ..
        } => {
            context.insert("customer_name", &customer_name.as_deref().unwrap_or(""));
            context.insert("amount", amount);
            context.insert("shipping", shipping);
            format!("{SUBJECT_PREFIX} ご注文ありがとうございます: {order_id}")
        }
        OrderNotification::NewOrder {
            customer_email,
            amount,
            shipping,
            ..
        } => {
            context.insert("customer_email", &customer_email.as_deref().unwrap_or("（未入力）"));
            context.insert("amount", amount);
            context.insert("shipping", shipping);
            format!("{SUBJECT_PREFIX} 新規注文 {amount}: {order_id}")
        }
        OrderNotification::ShippingAttention {
            customer_email,
            amount,
            problems,
            ..
        } => {
            context.insert("customer_email", &customer_email.as_deref().unwrap_or("（未入力）"));
            context.insert("amount", amount);
            context.insert("problems", problems);
            format!("{SUBJECT_PREFIX} 要対応 配送先に不備があります: {order_id}")
        }
    };

    (subject, context)
}
