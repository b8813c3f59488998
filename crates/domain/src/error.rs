//! # ドメイン層エラー定義
//!
//! ビジネスルール違反を表現するエラー型。
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `Validation` | 400 Bad Request | 入力値の検証失敗 |
//! | `NotFound` | 404 Not Found | エンティティが存在しない |
//! | `Conflict` | 409 Conflict | 楽観的ロックの失敗 |
//!
//! 投票固有の失敗は [`VoteError`](crate::review::VoteError) で表現する。
//!
//! ```rust
//! use storefront_domain::DomainError;
//!
//! fn find_review(id: &str) -> Result<(), DomainError> {
//!     Err(DomainError::NotFound {
//!         entity_type: "Review",
//!         id:          id.to_string(),
//!     })
//! }
//!
//! assert!(find_review("r-1").is_err());
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 入力値がビジネスルールに違反している
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 指定された ID のエンティティが存在しない
    #[error("{entity_type} が見つかりません: {id}")]
    NotFound {
        /// エンティティの種類（"Review" など）
        entity_type: &'static str,
        /// 検索に使用した識別子
        id:          String,
    },

    /// 同時更新による競合
    ///
    /// 最新データを再取得してから再度更新を試みる必要がある。
    #[error("競合が発生しました: {0}")]
    Conflict(String),
}
