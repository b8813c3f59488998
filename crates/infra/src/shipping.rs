//! # 配送キャリア連携
//!
//! 追跡照会とラベル作成を [`ShippingCarrier`] トレイトで抽象化する。
//!
//! | 実装 | `SHIPPING_BACKEND` | 概要 |
//! |------|--------------------|------|
//! | [`StubShippingCarrier`] | `stub`（デフォルト） | 外部通信せず固定の応答を返す |
//! | [`HttpShippingCarrier`] | `http` | OAuth クライアントクレデンシャルで REST API を呼ぶ |

mod http_carrier;
mod stub;

use async_trait::async_trait;
pub use http_carrier::{HttpCarrierConfig, HttpShippingCarrier};
use storefront_domain::shipping::{LabelRequest, ShipmentLabel, TrackingInfo, TrackingNumber};
pub use stub::StubShippingCarrier;
use thiserror::Error;

/// 配送キャリア呼び出しのエラー
#[derive(Debug, Error)]
pub enum ShippingError {
    /// 追跡番号がキャリアに存在しない
    #[error("追跡番号が見つかりません: {0}")]
    NotFound(String),

    /// アクセストークンの取得に失敗した、またはトークンが拒否された
    #[error("配送キャリアの認証に失敗しました: {0}")]
    Auth(String),

    #[error("配送キャリアがエラーを返しました: status={status}, body={body}")]
    Carrier { status: u16, body: String },

    #[error("配送キャリアとの通信に失敗しました: {0}")]
    Network(String),

    #[error("配送キャリアの応答が不正です: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ShippingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// 配送キャリア
#[async_trait]
pub trait ShippingCarrier: Send + Sync {
    /// 追跡情報を取得する
    async fn track(&self, tracking_number: &TrackingNumber) -> Result<TrackingInfo, ShippingError>;

    /// 配送ラベルを作成する
    async fn create_label(&self, request: &LabelRequest) -> Result<ShipmentLabel, ShippingError>;
}
