//! # 通知送信
//!
//! メール送信を `NotificationSender` トレイトで抽象化する。
//!
//! | 実装 | 用途 | `NOTIFICATION_BACKEND` |
//! |------|------|------------------------|
//! | [`SmtpNotificationSender`] | 開発（Mailpit）や SMTP リレー | `smtp` |
//! | [`SesNotificationSender`] | 本番（AWS SES v2） | `ses` |
//! | [`NoopNotificationSender`] | 送信しない（ログのみ） | `noop` |

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
pub use ses::SesNotificationSender;
pub use smtp::SmtpNotificationSender;
use storefront_domain::notification::{EmailMessage, NotificationError};

/// メール送信トレイト
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;
}
