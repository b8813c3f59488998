//! # Storefront インフラ層
//!
//! 外部システムとの接続を担当する。
//!
//! ## 責務
//!
//! - **データベース**: PostgreSQL 接続プール、マイグレーション、レビューリポジトリ
//! - **決済**: 決済ゲートウェイクライアントと Webhook 署名検証
//! - **配送**: 配送キャリアクライアント（スタブ / HTTP）
//! - **通知**: メール送信（SMTP / SES / Noop）
//!
//! ## 依存関係
//!
//! ```text
//! shop-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層に依存しない。外部サービスとの境界はすべて
//! `async_trait` のトレイトで表し、アプリケーションは `Arc<dyn Trait>` で保持する。
//!
//! ## モジュール構成
//!
//! - [`db`] - 接続プールとマイグレーション
//! - [`error`] - インフラ層エラー
//! - [`notification`] - メール送信
//! - [`payment`] - 決済ゲートウェイと Webhook 署名
//! - [`repository`] - リポジトリ実装
//! - [`shipping`] - 配送キャリア

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod payment;
pub mod repository;
pub mod shipping;

pub use error::InfraError;
