//! # Storefront ドメイン層
//!
//! レビュー、投票台帳、注文、配送、通知のドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! shop-service → infra → domain
//! ```
//!
//! ドメイン層は DB や外部 API に一切依存しない。時刻は [`clock::Clock`] で
//! 注入し、永続化や送信はインフラ層のトレイト実装に委ねる。
//!
//! ## モジュール構成
//!
//! - [`review`] - レビューエンティティと投票台帳（Vote Ledger）
//! - [`order`] - カート明細と配送先情報の検証
//! - [`shipping`] - 追跡番号、追跡情報、配送ラベル
//! - [`notification`] - 注文通知とメールメッセージ
//!
//! ## 使用例
//!
//! ```rust
//! use storefront_domain::{
//!     DomainError,
//!     review::{VoteAction, apply_vote},
//! };
//!
//! let transition = apply_vote(None, VoteAction::Like).unwrap();
//! assert_eq!(transition.thumbs_up_delta, 1);
//!
//! let error: DomainError = "upvote".parse::<VoteAction>().unwrap_err();
//! assert!(matches!(error, DomainError::Validation(_)));
//! ```

#[macro_use]
mod macros;

pub mod clock;
pub mod error;
pub mod notification;
pub mod order;
pub mod review;
pub mod shipping;
pub mod value_objects;

pub use error::DomainError;
