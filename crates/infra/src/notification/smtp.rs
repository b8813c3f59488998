//! lettre の非同期 SMTP トランスポートによる送信実装
//!
//! TLS なしで接続する（Mailpit などローカル SMTP サーバー向け）。

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
};
use storefront_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;

/// SMTP 通知送信
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from:      Mailbox,
}

impl SmtpNotificationSender {
    /// # Errors
    ///
    /// 送信元アドレスがメールボックスとして解釈できない場合。
    pub fn new(host: &str, port: u16, from_address: &str) -> Result<Self, NotificationError> {
        let from = from_address
            .parse::<Mailbox>()
            .map_err(|e| NotificationError::SendFailed(format!("送信元アドレス不正: {e}")))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();

        Ok(Self { transport, from })
    }
}

/// テキストと HTML の multipart/alternative メッセージを組み立てる
fn build_message(from: &Mailbox, email: &EmailMessage) -> Result<Message, NotificationError> {
    let to = email
        .to
        .parse::<Mailbox>()
        .map_err(|e| NotificationError::SendFailed(format!("宛先アドレス不正: {e}")))?;

    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(&email.subject)
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(email.text_body.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
        )
        .map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = build_message(&self.from, email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(())
    }
}
