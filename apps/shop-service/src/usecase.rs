//! # ユースケース層
//!
//! Shop Service のアプリケーションロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリや外部サービスのクライアントを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは DTO の変換だけを行い、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `review`: レビューの投稿と投票
//! - `checkout`: チェックアウトセッションの作成
//! - `payment_webhook`: 決済完了 Webhook の処理
//! - `shipping`: 追跡照会とラベル作成
//! - `notification`: 注文メールの生成と送信

pub mod checkout;
pub mod notification;
pub mod payment_webhook;
pub mod review;
pub mod shipping;

pub use checkout::{CheckoutInput, CheckoutItemInput, CheckoutUseCaseImpl};
pub use notification::{NotificationService, TemplateRenderer};
pub use payment_webhook::{PaymentWebhookUseCaseImpl, WebhookOutcome};
pub use review::{CreateReviewInput, IncrementInput, ReviewUseCaseImpl, VoteInput};
pub use shipping::{CreateLabelInput, ShippingUseCaseImpl};
