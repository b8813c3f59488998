//! # 決済 Webhook ユースケース
//!
//! 決済プロバイダからの Webhook を検証し、決済完了イベントを処理する。
//!
//! 1. `Stripe-Signature` ヘッダで署名とタイムスタンプを検証する
//! 2. `checkout.session.completed` 以外のイベントは受領だけして無視する
//! 3. 配送先を検証し、結果に応じて通知を送る
//!    - 有効: 購入者への注文確認（メールアドレスがある場合）と店舗オーナーへの新規注文
//!    - 不備あり: 店舗オーナーへの配送先不備アラート
//!
//! 通知は fire-and-forget のため、送信に失敗しても Webhook は成功扱いになる。

use std::sync::Arc;

use serde::Deserialize;
use storefront_domain::{
    clock::Clock,
    notification::OrderNotification,
    order::{PaidOrder, ShippingDetails, UnverifiedShipping, format_amount},
    value_objects::EmailAddress,
};
use storefront_infra::payment::verify_webhook_signature;
use storefront_shared::{event_log::event, log_business_event};

use super::NotificationService;
use crate::error::ShopError;

/// 処理対象のイベント種別
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Webhook 処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// 配送先が有効な注文として通知した
    OrderAccepted,
    /// 配送先に不備があり店舗オーナーに通知した
    ShippingNeedsAttention,
    /// 対象外のイベント種別
    Ignored,
}

// --- Webhook ペイロード ---

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    id:         String,
    #[serde(rename = "type")]
    event_type: String,
    data:       WebhookEventData,
}

#[derive(Debug, Deserialize)]
struct WebhookEventData {
    object: serde_json::Value,
}

/// 決済完了したチェックアウトセッション
#[derive(Debug, Deserialize)]
struct CompletedSession {
    id:                    String,
    #[serde(default)]
    amount_total:          Option<i64>,
    #[serde(default)]
    currency:              Option<String>,
    #[serde(default)]
    customer_email:        Option<String>,
    #[serde(default)]
    customer_details:      Option<CustomerDetails>,
    #[serde(default)]
    shipping_details:      Option<ShippingPayload>,
    /// 新しい API バージョンでは配送先がここに入る
    #[serde(default)]
    collected_information: Option<CollectedInformation>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
    email: Option<String>,
    name:  Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectedInformation {
    shipping_details: Option<ShippingPayload>,
}

#[derive(Debug, Deserialize)]
struct ShippingPayload {
    name:    Option<String>,
    address: Option<AddressPayload>,
}

#[derive(Debug, Deserialize)]
struct AddressPayload {
    line1:       Option<String>,
    line2:       Option<String>,
    city:        Option<String>,
    state:       Option<String>,
    postal_code: Option<String>,
    country:     Option<String>,
}

impl CompletedSession {
    fn shipping(&self) -> Option<UnverifiedShipping> {
        let payload = self.shipping_details.as_ref().or_else(|| {
            self.collected_information
                .as_ref()
                .and_then(|c| c.shipping_details.as_ref())
        })?;
        let address = payload.address.as_ref();

        Some(UnverifiedShipping {
            name:        payload.name.clone(),
            line1:       address.and_then(|a| a.line1.clone()),
            line2:       address.and_then(|a| a.line2.clone()),
            city:        address.and_then(|a| a.city.clone()),
            state:       address.and_then(|a| a.state.clone()),
            postal_code: address.and_then(|a| a.postal_code.clone()),
            country:     address.and_then(|a| a.country.clone()),
        })
    }

    fn into_paid_order(self) -> PaidOrder {
        let details = self.customer_details;
        let raw_email = details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or(self.customer_email);

        let customer_email = raw_email.and_then(|email| match EmailAddress::new(email) {
            Ok(email) => Some(email),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.id,
                    error = %e,
                    "購入者メールアドレスが不正なため無視します"
                );
                None
            }
        });

        PaidOrder {
            session_id: self.id,
            customer_email,
            customer_name: details.and_then(|d| d.name),
            amount_total: self
                .amount_total
                .and_then(|a| u64::try_from(a).ok())
                .unwrap_or(0),
            currency: self
                .currency
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or_else(|| "usd".to_string()),
        }
    }
}

/// 決済 Webhook ユースケース
pub struct PaymentWebhookUseCaseImpl {
    webhook_secret: String,
    owner_email:    String,
    notification:   Arc<NotificationService>,
    clock:          Arc<dyn Clock>,
}

impl PaymentWebhookUseCaseImpl {
    pub fn new(
        webhook_secret: impl Into<String>,
        owner_email: impl Into<String>,
        notification: Arc<NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            owner_email: owner_email.into(),
            notification,
            clock,
        }
    }

    /// Webhook を処理する
    ///
    /// `payload` は受信した生のボディ。署名はこのバイト列に対して検証する。
    pub async fn handle(
        &self,
        signature_header: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookOutcome, ShopError> {
        if let Err(e) = verify_webhook_signature(
            signature_header,
            payload,
            &self.webhook_secret,
            self.clock.now(),
        ) {
            log_business_event!(
                event.category = event::category::PAYMENT,
                event.action = event::action::WEBHOOK_REJECTED,
                event.entity_type = event::entity_type::PAYMENT_EVENT,
                event.result = event::result::FAILURE,
                reason = %e,
                "Webhook の署名検証に失敗しました"
            );
            return Err(e.into());
        }

        let webhook_event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| ShopError::BadRequest(format!("Webhook ペイロードが不正です: {e}")))?;

        log_business_event!(
            event.category = event::category::PAYMENT,
            event.action = event::action::WEBHOOK_RECEIVED,
            event.entity_type = event::entity_type::PAYMENT_EVENT,
            event.entity_id = %webhook_event.id,
            event.result = event::result::SUCCESS,
            payment.event_type = %webhook_event.event_type,
            "Webhook を受信しました"
        );

        if webhook_event.event_type != CHECKOUT_SESSION_COMPLETED {
            tracing::debug!(
                event_type = %webhook_event.event_type,
                "対象外のイベントのため無視します"
            );
            return Ok(WebhookOutcome::Ignored);
        }

        let session: CompletedSession = serde_json::from_value(webhook_event.data.object)
            .map_err(|e| ShopError::BadRequest(format!("チェックアウトセッションが不正です: {e}")))?;

        Ok(self.process_completed_session(session).await)
    }

    async fn process_completed_session(&self, session: CompletedSession) -> WebhookOutcome {
        let shipping = session.shipping();
        let order = session.into_paid_order();
        let amount = format_amount(order.amount_total, &order.currency);
        let customer_email = order.customer_email.as_ref().map(|e| e.as_str().to_string());

        match ShippingDetails::validate(shipping.as_ref()) {
            Ok(details) => {
                if let Some(email) = &customer_email {
                    self.notification
                        .notify(OrderNotification::OrderConfirmation {
                            order_id:       order.session_id.clone(),
                            customer_email: email.clone(),
                            customer_name:  order.customer_name.clone(),
                            amount:         amount.clone(),
                            shipping:       details.clone(),
                        })
                        .await;
                }
                self.notification
                    .notify(OrderNotification::NewOrder {
                        order_id: order.session_id,
                        customer_email,
                        amount,
                        shipping: details,
                        owner_email: self.owner_email.clone(),
                    })
                    .await;
                WebhookOutcome::OrderAccepted
            }
            Err(problems) => {
                let codes: Vec<&'static str> = problems.iter().map(Into::into).collect();
                log_business_event!(
                    event.category = event::category::PAYMENT,
                    event.action = event::action::ORDER_SHIPPING_INVALID,
                    event.entity_type = event::entity_type::CHECKOUT_SESSION,
                    event.entity_id = %order.session_id,
                    event.result = event::result::FAILURE,
                    shipping.problems = ?codes,
                    "配送先に不備がある注文を受け付けました"
                );

                self.notification
                    .notify(OrderNotification::ShippingAttention {
                        order_id: order.session_id,
                        customer_email,
                        amount,
                        problems: problems.iter().map(ToString::to_string).collect(),
                        owner_email: self.owner_email.clone(),
                    })
                    .await;
                WebhookOutcome::ShippingNeedsAttention
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use storefront_domain::clock::FixedClock;
    use storefront_infra::{mock::MockNotificationSender, payment::sign_payload};

    use super::*;
    use crate::usecase::notification::TemplateRenderer;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_767_225_600;

    fn make_sut(sender: MockNotificationSender) -> PaymentWebhookUseCaseImpl {
        let now: DateTime<Utc> = DateTime::from_timestamp(NOW, 0).unwrap();
        let notification = NotificationService::new(Arc::new(sender), TemplateRenderer::new().unwrap());
        PaymentWebhookUseCaseImpl::new(
            SECRET,
            "owner@example.com",
            Arc::new(notification),
            Arc::new(FixedClock::new(now)),
        )
    }

    fn completed_event(shipping: serde_json::Value) -> Vec<u8> {
        json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_a1",
                    "object": "checkout.session",
                    "amount_total": 5200,
                    "currency": "usd",
                    "customer_details": { "email": "jane@example.com", "name": "Jane Doe" },
                    "shipping_details": shipping
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn valid_shipping() -> serde_json::Value {
        json!({
            "name": "Jane Doe",
            "address": {
                "line1": "1 Main St",
                "line2": null,
                "city": "Springfield",
                "state": "IL",
                "postal_code": "62701",
                "country": "US"
            }
        })
    }

    fn sign(payload: &[u8]) -> String {
        sign_payload(payload, SECRET, NOW).unwrap()
    }

    #[tokio::test]
    async fn test_有効な配送先なら購入者とオーナーに通知する() {
        let sender = MockNotificationSender::new();
        let sut = make_sut(sender.clone());
        let payload = completed_event(valid_shipping());
        let header = sign(&payload);

        let outcome = sut.handle(Some(header.as_str()), &payload).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::OrderAccepted);
        let recipients: Vec<String> = sender.sent_emails().into_iter().map(|e| e.to).collect();
        assert_eq!(recipients, vec!["jane@example.com", "owner@example.com"]);
        assert!(sender.sent_emails()[1].subject.contains("52.00 USD"));
    }

    #[tokio::test]
    async fn test_配送先に不備があればオーナーにだけ通知する() {
        let sender = MockNotificationSender::new();
        let sut = make_sut(sender.clone());
        let payload = completed_event(json!({
            "name": "Jane Doe",
            "address": { "line1": "1 Main St", "city": "", "postal_code": "62701", "country": "USA" }
        }));

        let outcome = sut.handle(Some(sign(&payload).as_str()), &payload).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::ShippingNeedsAttention);
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");
        assert!(sent[0].text_body.contains("市区町村がありません"));
        assert!(sent[0].text_body.contains("USA"));
    }

    #[tokio::test]
    async fn test_新しいapiバージョンの配送先も読み取る() {
        let sender = MockNotificationSender::new();
        let sut = make_sut(sender.clone());
        let payload = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_b2",
                "amount_total": 999,
                "currency": "usd",
                "customer_email": "bob@example.com",
                "collected_information": { "shipping_details": valid_shipping() }
            }}
        })
        .to_string()
        .into_bytes();

        let outcome = sut.handle(Some(sign(&payload).as_str()), &payload).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::OrderAccepted);
        assert_eq!(sender.sent_emails()[0].to, "bob@example.com");
    }

    #[tokio::test]
    async fn test_購入者メールがなければオーナーにだけ通知する() {
        let sender = MockNotificationSender::new();
        let sut = make_sut(sender.clone());
        let payload = json!({
            "id": "evt_3",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_c3",
                "amount_total": 999,
                "currency": "usd",
                "shipping_details": valid_shipping()
            }}
        })
        .to_string()
        .into_bytes();

        sut.handle(Some(sign(&payload).as_str()), &payload).await.unwrap();

        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "owner@example.com");
    }

    #[tokio::test]
    async fn test_対象外のイベントは無視する() {
        let sender = MockNotificationSender::new();
        let sut = make_sut(sender.clone());
        let payload = br#"{"id":"evt_4","type":"payment_intent.created","data":{"object":{}}}"#;

        let outcome = sut.handle(Some(sign(payload).as_str()), payload).await.unwrap();

        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_改ざんされたボディは署名エラー() {
        let sender = MockNotificationSender::new();
        let sut = make_sut(sender.clone());
        let payload = completed_event(valid_shipping());
        let header = sign(&payload);
        let tampered = String::from_utf8(payload).unwrap().replace("5200", "1");

        let result = sut.handle(Some(header.as_str()), tampered.as_bytes()).await;

        assert!(matches!(result, Err(ShopError::InvalidSignature(_))));
        assert!(sender.sent_emails().is_empty());
    }

    #[tokio::test]
    async fn test_署名ヘッダがなければ署名エラー() {
        let sut = make_sut(MockNotificationSender::new());
        let payload = completed_event(valid_shipping());

        let result = sut.handle(None, &payload).await;

        assert!(matches!(result, Err(ShopError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_署名が正しくてもjsonが壊れていれば400() {
        let sut = make_sut(MockNotificationSender::new());
        let payload = b"{not json";

        let result = sut.handle(Some(sign(payload).as_str()), payload).await;

        assert!(matches!(result, Err(ShopError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_メール送信に失敗してもwebhookは成功する() {
        let sut = make_sut(MockNotificationSender::failing());
        let payload = completed_event(valid_shipping());

        let outcome = sut.handle(Some(sign(&payload).as_str()), &payload).await;

        assert_eq!(outcome.unwrap(), WebhookOutcome::OrderAccepted);
    }
}
