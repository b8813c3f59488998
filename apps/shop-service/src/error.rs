//! # Shop Service エラー定義
//!
//! Shop Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | バリアント | ステータス | `type` の末尾 |
//! |-----------|-----------|---------------|
//! | `BadRequest` | 400 | `validation-error` |
//! | `InvalidSignature` | 400 | `invalid-signature` |
//! | `NotFound` | 404 | `not-found` |
//! | `NothingToRemove` | 409 | `nothing-to-remove` |
//! | `Conflict` | 409 | `conflict` |
//! | `BadGateway` | 502 | `bad-gateway` |
//! | `Database` / `Internal` | 500 | `internal-error` |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storefront_domain::{DomainError, review::VoteError};
use storefront_infra::{
    InfraError,
    payment::{PaymentError, SignatureError},
    shipping::ShippingError,
};
use storefront_shared::{ErrorResponse, event_log::error as log_error};
use thiserror::Error;

/// Shop Service で発生するエラー
#[derive(Debug, Error)]
pub enum ShopError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 入力値の検証失敗
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 票がないのに取り消そうとした
    #[error("取り消す票がありません")]
    NothingToRemove,

    /// 競合（楽観的ロックの再試行上限に到達）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// Webhook の署名検証に失敗
    #[error("Webhook 署名が不正です: {0}")]
    InvalidSignature(#[from] SignatureError),

    /// 決済プロバイダ・配送キャリアの失敗
    #[error("外部サービスエラー: {0}")]
    BadGateway(String),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(InfraError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<InfraError> for ShopError {
    fn from(err: InfraError) -> Self {
        match err.as_conflict() {
            Some((entity, id)) => {
                Self::Conflict(format!("{entity}(id={id}) は他の操作で更新されました"))
            }
            None => Self::Database(err),
        }
    }
}

impl From<DomainError> for ShopError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
            DomainError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<VoteError> for ShopError {
    fn from(err: VoteError) -> Self {
        match err {
            VoteError::NothingToRemove => Self::NothingToRemove,
            VoteError::CounterLimitReached => Self::Conflict(err.to_string()),
        }
    }
}

impl From<PaymentError> for ShopError {
    fn from(err: PaymentError) -> Self {
        Self::BadGateway(err.to_string())
    }
}

impl From<ShippingError> for ShopError {
    fn from(err: ShippingError) -> Self {
        match err {
            ShippingError::NotFound(number) => {
                Self::NotFound(format!("追跡番号が見つかりません: {number}"))
            }
            other => Self::BadGateway(other.to_string()),
        }
    }
}

impl ShopError {
    fn to_error_response(&self) -> ErrorResponse {
        match self {
            ShopError::NotFound(msg) => ErrorResponse::not_found(msg.clone()),
            ShopError::BadRequest(msg) => ErrorResponse::validation_error(msg.clone()),
            ShopError::NothingToRemove => ErrorResponse::new(
                "nothing-to-remove",
                "Nothing To Remove",
                409,
                "取り消す票がありません",
            ),
            ShopError::Conflict(msg) => ErrorResponse::conflict(msg.clone()),
            ShopError::InvalidSignature(e) => {
                ErrorResponse::new("invalid-signature", "Invalid Signature", 400, e.to_string())
            }
            ShopError::BadGateway(msg) => {
                tracing::warn!(
                    error.category = log_error::category::EXTERNAL_SERVICE,
                    "外部サービスエラー: {}",
                    msg
                );
                ErrorResponse::bad_gateway("外部サービスの呼び出しに失敗しました")
            }
            ShopError::Database(e) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::DATABASE,
                    span_trace = %e.span_trace(),
                    "データベースエラー: {}",
                    e
                );
                ErrorResponse::internal_error()
            }
            ShopError::Internal(msg) => {
                tracing::error!(
                    error.category = log_error::category::INFRASTRUCTURE,
                    error.kind = log_error::kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ShopError::NotFound("r".into()), 404, "not-found")]
    #[case(ShopError::BadRequest("x".into()), 400, "validation-error")]
    #[case(ShopError::NothingToRemove, 409, "nothing-to-remove")]
    #[case(ShopError::Conflict("x".into()), 409, "conflict")]
    #[case(ShopError::InvalidSignature(SignatureError::Mismatch), 400, "invalid-signature")]
    #[case(ShopError::BadGateway("x".into()), 502, "bad-gateway")]
    #[case(ShopError::Internal("x".into()), 500, "internal-error")]
    fn test_エラー種別ごとのステータスとtype(
        #[case] error: ShopError,
        #[case] status: u16,
        #[case] suffix: &str,
    ) {
        let body = error.to_error_response();

        assert_eq!(body.status, status);
        assert!(body.error_type.ends_with(suffix), "{}", body.error_type);
        assert_eq!(error.into_response().status().as_u16(), status);
    }

    #[test]
    fn test_内部エラーの詳細はレスポンスに含めない() {
        let body = ShopError::Internal("接続文字列 postgres://secret".into()).to_error_response();

        assert!(!body.detail.contains("secret"));
    }

    #[test]
    fn test_infraのconflictはconflictに変換される() {
        let error: ShopError = InfraError::conflict("Review", "r-1").into();

        assert!(matches!(error, ShopError::Conflict(ref msg) if msg.contains("r-1")));
    }

    #[test]
    fn test_追跡番号なしは404でそれ以外のキャリア失敗は502() {
        let not_found: ShopError = ShippingError::NotFound("1Z999".into()).into();
        let network: ShopError = ShippingError::Network("timeout".into()).into();

        assert!(matches!(not_found, ShopError::NotFound(_)));
        assert!(matches!(network, ShopError::BadGateway(_)));
    }

    #[test]
    fn test_カウンタ上限はconflictに変換される() {
        let error: ShopError = VoteError::CounterLimitReached.into();

        assert!(matches!(error, ShopError::Conflict(_)));
        assert_eq!(error.to_error_response().status, 409);
    }

    #[test]
    fn test_ドメインの検証エラーは400() {
        let error: ShopError = DomainError::Validation("評価は 1〜5".into()).into();

        assert!(matches!(error, ShopError::BadRequest(_)));
    }
}
