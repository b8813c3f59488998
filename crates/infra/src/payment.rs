//! # 決済プロバイダ連携
//!
//! チェックアウトセッションの作成を [`PaymentGateway`] トレイトで抽象化し、
//! Webhook の署名検証関数を提供する。
//!
//! - [`StripePaymentGateway`]: Stripe 互換の REST API クライアント
//! - [`verify_webhook_signature`]: `Stripe-Signature` ヘッダの検証

mod signature;
mod stripe;

use async_trait::async_trait;
use serde::Serialize;
pub use signature::{
    SIGNATURE_HEADER,
    SIGNATURE_TOLERANCE_SECS,
    SignatureError,
    sign_payload,
    verify_webhook_signature,
};
use storefront_domain::order::Cart;
pub use stripe::{StripeConfig, StripePaymentGateway};
use thiserror::Error;

/// 決済プロバイダ呼び出しのエラー
#[derive(Debug, Error)]
pub enum PaymentError {
    /// プロバイダが 2xx 以外を返した
    #[error("決済プロバイダがエラーを返しました: status={status}, body={body}")]
    Provider { status: u16, body: String },

    /// 接続失敗・タイムアウトなど
    #[error("決済プロバイダとの通信に失敗しました: {0}")]
    Network(String),

    /// 応答の JSON が想定と異なる
    #[error("決済プロバイダの応答が不正です: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// チェックアウトの明細 1 行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub name:        String,
    /// 最小通貨単位（セント等）
    pub unit_amount: u64,
    pub quantity:    u32,
}

/// チェックアウトセッション作成リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items:     Vec<CheckoutLineItem>,
    pub customer_email: Option<String>,
    /// ISO 4217 の小文字コード（例: `usd`）
    pub currency:       String,
}

impl CheckoutSessionRequest {
    pub fn from_cart(cart: &Cart, currency: impl Into<String>) -> Self {
        Self {
            line_items:     cart
                .items()
                .iter()
                .map(|item| CheckoutLineItem {
                    name:        item.name().as_str().to_string(),
                    unit_amount: item.unit_amount(),
                    quantity:    item.quantity(),
                })
                .collect(),
            customer_email: cart.customer_email().map(|e| e.as_str().to_string()),
            currency:       currency.into().to_ascii_lowercase(),
        }
    }
}

/// 作成されたチェックアウトセッション
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub id:  String,
    /// 購入者をリダイレクトするホスト型決済ページの URL
    pub url: String,
}

/// 決済ゲートウェイ
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use storefront_domain::{
        order::{CartItem, ItemName},
        value_objects::EmailAddress,
    };

    use super::*;

    #[test]
    fn test_カートからリクエストを組み立てる() {
        let cart = Cart::new(
            vec![CartItem::new(ItemName::new("ドリップバッグ").unwrap(), 1500, 2).unwrap()],
            Some(EmailAddress::new("buyer@example.com").unwrap()),
        )
        .unwrap();

        let request = CheckoutSessionRequest::from_cart(&cart, "USD");

        assert_eq!(
            request,
            CheckoutSessionRequest {
                line_items:     vec![CheckoutLineItem {
                    name:        "ドリップバッグ".to_string(),
                    unit_amount: 1500,
                    quantity:    2,
                }],
                customer_email: Some("buyer@example.com".to_string()),
                currency:       "usd".to_string(),
            }
        );
    }
}
