//! # インフラ層エラー定義
//!
//! データベースとの通信や永続化データの変換で発生するエラー。
//!
//! `std::io::Error` と同じ struct + enum の構成:
//! - [`InfraError`]: 種別（[`InfraErrorKind`]）と生成時点の [`SpanTrace`] を保持する
//! - [`InfraErrorKind`]: Database / Serialization / Conflict / InvalidInput / Unexpected
//!
//! 決済、配送、メール送信の失敗はそれぞれのポート固有のエラー型で表す
//! （`PaymentError`, `ShippingError`, `NotificationError`）。

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// `From<sqlx::Error>` 等の変換や convenience constructor で生成すると、
/// その時点のスパン情報が自動的に捕捉される。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    #[error("データベースエラー: {0}")]
    Database(#[source] sqlx::Error),

    /// JSONB カラムの変換失敗など
    #[error("シリアライズエラー: {0}")]
    Serialization(#[source] serde_json::Error),

    /// 楽観的ロック競合（期待したバージョンと保存済みのバージョンが異なる）
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict {
        entity: String,
        id:     String,
    },

    /// 原因がクライアント入力にあるエラー
    #[error("入力エラー: {0}")]
    InvalidInput(String),

    /// 保存済みデータがドメインの制約を満たさない場合など
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

impl InfraError {
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Conflict の場合に entity と id を返す
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        match &self.kind {
            InfraErrorKind::Conflict { entity, id } => Some((entity, id)),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.as_conflict().is_some()
    }

    fn with_kind(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    // ===== Convenience constructors =====

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Conflict {
            entity: entity.into(),
            id:     id.into(),
        })
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::InvalidInput(msg.into()))
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::with_kind(InfraErrorKind::Unexpected(msg.into()))
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::with_kind(InfraErrorKind::Database(source))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::with_kind(InfraErrorKind::Serialization(source))
    }
}
