//! REST API を持つ配送キャリアのクライアント
//!
//! - トークン: `POST {base}/security/v1/oauth/token`（client_credentials）
//! - 追跡: `GET {base}/api/track/v1/details/{trackingNumber}`
//! - ラベル: `POST {base}/api/shipments/v1/ship`
//!
//! アクセストークンはクライアント内に保持し、期限の 60 秒前まで使い回す。
//! 401 を受けた場合は保持中のトークンを破棄し、次回呼び出しで取り直す。

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use storefront_domain::shipping::{
    LabelFormat,
    LabelRequest,
    ShipmentLabel,
    TrackingEvent,
    TrackingInfo,
    TrackingNumber,
    TrackingStatus,
};
use tokio::sync::Mutex;

use super::{ShippingCarrier, ShippingError};

/// 期限切れ扱いにするまでの余裕（秒）
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
/// `expires_in` の上限（1 日）
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

/// キャリア API 接続設定
#[derive(Debug, Clone)]
pub struct HttpCarrierConfig {
    pub api_base_url:   String,
    pub client_id:      String,
    pub client_secret:  String,
    pub account_number: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at:   DateTime<Utc>,
}

impl CachedToken {
    fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// HTTP 配送キャリア
pub struct HttpShippingCarrier {
    config: HttpCarrierConfig,
    client: reqwest::Client,
    token:  Mutex<Option<CachedToken>>,
}

impl HttpShippingCarrier {
    pub fn new(config: HttpCarrierConfig) -> Self {
        Self {
            config: HttpCarrierConfig {
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: reqwest::Client::new(),
            token:  Mutex::new(None),
        }
    }

    /// 有効なアクセストークンを返す
    ///
    /// ロックを保持したまま取得するため、同時に期限切れを検知しても取得は 1 回で済む。
    async fn access_token(&self) -> Result<String, ShippingError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref().filter(|t| t.is_usable_at(now)) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.fetch_token(now).await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<CachedToken, ShippingError> {
        let url = format!("{}/security/v1/oauth/token", self.config.api_base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShippingError::Auth(format!("status={status}: {body}")));
        }

        let token = response.json::<TokenResponse>().await?;
        Ok(token.into_cached(now))
    }

    /// トークンを付けて送信し、401 ならキャッシュを破棄する
    async fn send_authorized(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ShippingError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            *self.token.lock().await = None;
            let body = response.text().await.unwrap_or_default();
            return Err(ShippingError::Auth(body));
        }

        Ok(response)
    }
}

// ===== ワイヤー形式 =====

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// 有効期間（秒）
    expires_in:   i64,
}

impl TokenResponse {
    fn into_cached(self, now: DateTime<Utc>) -> CachedToken {
        CachedToken {
            access_token: self.access_token,
            expires_at:   now + Duration::seconds(self.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackResponse {
    tracking_number:    String,
    status_code:        String,
    estimated_delivery: Option<NaiveDate>,
    #[serde(default)]
    events:             Vec<TrackEventDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackEventDto {
    timestamp:   DateTime<Utc>,
    description: String,
    location:    Option<String>,
}

impl TrackResponse {
    fn into_tracking_info(self) -> Result<TrackingInfo, ShippingError> {
        let tracking_number = TrackingNumber::new(self.tracking_number)
            .map_err(|e| ShippingError::InvalidResponse(e.to_string()))?;

        let mut events: Vec<TrackingEvent> = self
            .events
            .into_iter()
            .map(|e| TrackingEvent {
                occurred_at: e.timestamp,
                description: e.description,
                location:    e.location,
            })
            .collect();
        events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

        Ok(TrackingInfo {
            tracking_number,
            status: TrackingStatus::from_carrier_code(&self.status_code),
            estimated_delivery: self.estimated_delivery,
            events,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShipRequest<'a> {
    account_number: &'a str,
    label_format:   LabelFormat,
    weight_grams:   u32,
    recipient:      RecipientDto<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecipientDto<'a> {
    name:                   &'a str,
    street_lines:           Vec<&'a str>,
    city:                   &'a str,
    state_or_province_code: Option<&'a str>,
    postal_code:            &'a str,
    country_code:           &'a str,
}

impl<'a> ShipRequest<'a> {
    fn new(account_number: &'a str, request: &'a LabelRequest) -> Self {
        let recipient = request.recipient();
        Self {
            account_number,
            label_format: request.label_format(),
            weight_grams: request.weight_grams(),
            recipient: RecipientDto {
                name:                   recipient.recipient().as_str(),
                street_lines:           std::iter::once(recipient.line1())
                    .chain(recipient.line2())
                    .collect(),
                city:                   recipient.city(),
                state_or_province_code: recipient.state(),
                postal_code:            recipient.postal_code(),
                country_code:           recipient.country(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShipResponse {
    tracking_number: String,
    label_format:    LabelFormat,
    label_data:      String,
}

impl ShipResponse {
    fn into_label(self) -> Result<ShipmentLabel, ShippingError> {
        let tracking_number = TrackingNumber::new(self.tracking_number)
            .map_err(|e| ShippingError::InvalidResponse(e.to_string()))?;
        Ok(ShipmentLabel {
            tracking_number,
            label_format: self.label_format,
            label_data: self.label_data,
        })
    }
}

/// ステータスを確認してボディをデシリアライズする
///
/// `not_found` を指定した場合、404 はそのエラーになる。
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    not_found: Option<ShippingError>,
) -> Result<T, ShippingError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    if status == reqwest::StatusCode::NOT_FOUND
        && let Some(err) = not_found
    {
        return Err(err);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ShippingError::Carrier {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ShippingCarrier for HttpShippingCarrier {
    #[tracing::instrument(skip_all, fields(%tracking_number))]
    async fn track(&self, tracking_number: &TrackingNumber) -> Result<TrackingInfo, ShippingError> {
        let url = format!(
            "{}/api/track/v1/details/{}",
            self.config.api_base_url,
            urlencoding::encode(tracking_number.as_str())
        );

        let response = self.send_authorized(self.client.get(&url)).await?;
        let body: TrackResponse = handle_response(
            response,
            Some(ShippingError::NotFound(tracking_number.to_string())),
        )
        .await?;

        body.into_tracking_info()
    }

    #[tracing::instrument(skip_all, fields(label_format = %request.label_format()))]
    async fn create_label(&self, request: &LabelRequest) -> Result<ShipmentLabel, ShippingError> {
        let url = format!("{}/api/shipments/v1/ship", self.config.api_base_url);
        let body = ShipRequest::new(&self.config.account_number, request);

        let response = self
            .send_authorized(self.client.post(&url).json(&body))
            .await?;
        let label: ShipResponse = handle_response(response, None).await?;

        label.into_label()
    }
}
