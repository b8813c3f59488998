//! 送信を行わずログだけ残す実装

use async_trait::async_trait;
use storefront_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;

/// 通知無効時の送信実装
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            text_len = email.text_body.len(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_emailは常に成功する() {
        let email = EmailMessage {
            to:        "buyer@example.com".to_string(),
            subject:   "[Storefront] ご注文ありがとうございます".to_string(),
            html_body: "<p>ok</p>".to_string(),
            text_body: "ok".to_string(),
        };

        assert!(NoopNotificationSender.send_email(&email).await.is_ok());
    }
}
