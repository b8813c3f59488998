//! # 通知サービス
//!
//! テンプレートレンダリング → メール送信 → 結果のイベントログを統合する。
//!
//! `notify()` は fire-and-forget で、どのステップで失敗してもエラーを返さない。
//! 失敗はビジネスイベント（`notification.failed`）として記録される。

use std::sync::Arc;

use storefront_domain::notification::OrderNotification;
use storefront_infra::notification::NotificationSender;
use storefront_shared::{event_log::event, log_business_event};

use super::TemplateRenderer;

/// 通知サービス
pub struct NotificationService {
    sender:            Arc<dyn NotificationSender>,
    template_renderer: TemplateRenderer,
}

impl NotificationService {
    pub fn new(sender: Arc<dyn NotificationSender>, template_renderer: TemplateRenderer) -> Self {
        Self {
            sender,
            template_renderer,
        }
    }

    /// 通知を送信する（fire-and-forget）
    pub async fn notify(&self, notification: OrderNotification) {
        let event_type: &str = notification.event_type().into();
        let order_id = notification.order_id().to_string();

        let email = match self.template_renderer.render(&notification) {
            Ok(email) => email,
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::EMAIL,
                    event.entity_id = %order_id,
                    event.result = event::result::FAILURE,
                    notification.event_type = event_type,
                    error = %e,
                    "通知テンプレートのレンダリングに失敗"
                );
                return;
            }
        };

        match self.sender.send_email(&email).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.entity_type = event::entity_type::EMAIL,
                    event.entity_id = %order_id,
                    event.result = event::result::SUCCESS,
                    notification.event_type = event_type,
                    notification.recipient = %email.to,
                    "通知メール送信成功"
                );
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.entity_type = event::entity_type::EMAIL,
                    event.entity_id = %order_id,
                    event.result = event::result::FAILURE,
                    notification.event_type = event_type,
                    notification.recipient = %email.to,
                    error = %e,
                    "通知メール送信失敗"
                );
            }
        }
    }
}
