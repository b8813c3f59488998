//! Stripe 互換 REST API による PaymentGateway 実装
//!
//! `POST {base}/v1/checkout/sessions` にフォームエンコードで明細を送る。
//! シークレットキーは Bearer 認証で渡す。

use async_trait::async_trait;
use serde::Deserialize;

use super::{CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway};

/// Stripe 接続設定
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// 例: `https://api.stripe.com`
    pub api_base_url:      String,
    pub secret_key:        String,
    pub success_url:       String,
    pub cancel_url:        String,
    /// 配送先住所の収集を許可する国（ISO 3166-1 alpha-2）
    pub allowed_countries: Vec<String>,
}

/// Stripe 決済ゲートウェイ
#[derive(Clone)]
pub struct StripePaymentGateway {
    config: StripeConfig,
    client: reqwest::Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config: StripeConfig {
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: reqwest::Client::new(),
        }
    }
}

/// セッション作成レスポンスのうち使用するフィールド
#[derive(Debug, Deserialize)]
struct SessionResponse {
    id:  String,
    url: Option<String>,
}

/// Stripe のネストしたフォーム表記（`a[0][b]=...`）でパラメータを並べる
fn checkout_form(config: &StripeConfig, request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        (
            "success_url".to_string(),
            format!("{}?session_id={{CHECKOUT_SESSION_ID}}", config.success_url),
        ),
        ("cancel_url".to_string(), config.cancel_url.clone()),
    ];

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{i}]");
        form.push((
            format!("{prefix}[price_data][currency]"),
            request.currency.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][product_data][name]"),
            item.name.clone(),
        ));
        form.push((
            format!("{prefix}[price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));
    }

    for (i, country) in config.allowed_countries.iter().enumerate() {
        form.push((
            format!("shipping_address_collection[allowed_countries][{i}]"),
            country.clone(),
        ));
    }

    form
}

async fn handle_response(response: reqwest::Response) -> Result<CheckoutSession, PaymentError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PaymentError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    let session = response.json::<SessionResponse>().await?;
    let url = session.url.ok_or_else(|| {
        PaymentError::InvalidResponse(format!("セッション {} に URL がありません", session.id))
    })?;

    Ok(CheckoutSession {
        id: session.id,
        url,
    })
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    #[tracing::instrument(skip_all, fields(line_items = request.line_items.len()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .form(&checkout_form(&self.config, request))
            .send()
            .await?;

        handle_response(response).await
    }
}
