//! AWS SES v2 による送信実装

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    types::{Body, Content, Destination, EmailContent, Message},
};
use storefront_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;

/// SES 通知送信
///
/// 送信元アドレスは SES で検証済みであること。
pub struct SesNotificationSender {
    client:       Client,
    from_address: String,
}

impl SesNotificationSender {
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }

    /// 環境（`AWS_REGION` や認証情報チェーン）から SES クライアントを構築する
    pub async fn from_env(from_address: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), from_address)
    }
}

fn content(data: &str, part: &str) -> Result<Content, NotificationError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| NotificationError::SendFailed(format!("{part}の構築に失敗: {e}")))
}

/// 件名、テキスト本文、HTML 本文から SES の EmailContent を組み立てる
fn build_content(email: &EmailMessage) -> Result<EmailContent, NotificationError> {
    let body = Body::builder()
        .text(content(&email.text_body, "テキスト本文")?)
        .html(content(&email.html_body, "HTML 本文")?)
        .build();

    let message = Message::builder()
        .subject(content(&email.subject, "件名")?)
        .body(body)
        .build();

    Ok(EmailContent::builder().simple(message).build())
}

#[async_trait]
impl NotificationSender for SesNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let destination = Destination::builder().to_addresses(&email.to).build();

        let output = self
            .client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(destination)
            .content(build_content(email)?)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SES 送信失敗: {e}")))?;

        tracing::debug!(message_id = ?output.message_id(), "SES でメールを送信しました");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_件名と両方の本文が設定される() {
        let email = EmailMessage {
            to:        "buyer@example.com".to_string(),
            subject:   "[Storefront] ご注文ありがとうございます".to_string(),
            html_body: "<p>本文</p>".to_string(),
            text_body: "本文".to_string(),
        };

        let content = build_content(&email).unwrap();

        let simple = content.simple().unwrap();
        assert_eq!(
            simple.subject().unwrap().data(),
            "[Storefront] ご注文ありがとうございます"
        );
        let body = simple.body().unwrap();
        assert_eq!(body.text().unwrap().data(), "本文");
        assert_eq!(body.html().unwrap().data(), "<p>本文</p>");
    }
}
