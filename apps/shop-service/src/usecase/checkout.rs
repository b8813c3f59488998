//! # チェックアウトユースケース
//!
//! カートを検証し、決済ゲートウェイにホスト型決済ページのセッションを作らせる。

use std::sync::Arc;

use storefront_domain::{
    order::{Cart, CartItem, ItemName},
    value_objects::EmailAddress,
};
use storefront_infra::payment::{CheckoutSession, CheckoutSessionRequest, PaymentGateway};
use storefront_shared::{event_log::event, log_business_event};

use crate::error::ShopError;

/// カート明細の入力
pub struct CheckoutItemInput {
    pub name:        String,
    pub unit_amount: i64,
    pub quantity:    i64,
}

/// チェックアウトの入力
pub struct CheckoutInput {
    pub items:          Vec<CheckoutItemInput>,
    pub customer_email: Option<String>,
}

/// チェックアウトユースケース
pub struct CheckoutUseCaseImpl {
    payment_gateway: Arc<dyn PaymentGateway>,
    currency:        String,
}

impl CheckoutUseCaseImpl {
    pub fn new(payment_gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>) -> Self {
        Self {
            payment_gateway,
            currency: currency.into(),
        }
    }

    /// チェックアウトセッションを作成する
    ///
    /// カートの検証に失敗した場合はゲートウェイを呼ばない。
    pub async fn create_session(&self, input: CheckoutInput) -> Result<CheckoutSession, ShopError> {
        let items = input
            .items
            .into_iter()
            .map(|item| CartItem::new(ItemName::new(item.name)?, item.unit_amount, item.quantity))
            .collect::<Result<Vec<_>, _>>()?;

        // 空文字列は未指定として扱う
        let customer_email = input
            .customer_email
            .filter(|e| !e.trim().is_empty())
            .map(EmailAddress::new)
            .transpose()?;

        let cart = Cart::new(items, customer_email)?;
        let request = CheckoutSessionRequest::from_cart(&cart, &self.currency);

        let session = self.payment_gateway.create_checkout_session(&request).await?;

        log_business_event!(
            event.category = event::category::PAYMENT,
            event.action = event::action::CHECKOUT_SESSION_CREATED,
            event.entity_type = event::entity_type::CHECKOUT_SESSION,
            event.entity_id = %session.id,
            event.result = event::result::SUCCESS,
            checkout.line_items = cart.items().len(),
            checkout.amount_total = cart.total_amount(),
            checkout.currency = %self.currency,
            "チェックアウトセッションを作成しました"
        );

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use storefront_infra::mock::MockPaymentGateway;

    use super::*;

    fn item(name: &str, unit_amount: i64, quantity: i64) -> CheckoutItemInput {
        CheckoutItemInput {
            name: name.to_string(),
            unit_amount,
            quantity,
        }
    }

    #[tokio::test]
    async fn test_カートの明細がそのままゲートウェイに渡る() {
        let gateway = MockPaymentGateway::new();
        let sut = CheckoutUseCaseImpl::new(Arc::new(gateway.clone()), "usd");

        let session = sut
            .create_session(CheckoutInput {
                items:          vec![item("ハンドドリップセット", 4800, 1), item("ペーパーフィルター", 350, 2)],
                customer_email: Some("buyer@example.com".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(session.id, "cs_test_mock_1");
        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].line_items.len(), 2);
        assert_eq!(requests[0].line_items[1].quantity, 2);
        assert_eq!(requests[0].currency, "usd");
        assert_eq!(requests[0].customer_email.as_deref(), Some("buyer@example.com"));
    }

    #[tokio::test]
    async fn test_空のメールアドレスは未指定として扱う() {
        let gateway = MockPaymentGateway::new();
        let sut = CheckoutUseCaseImpl::new(Arc::new(gateway.clone()), "usd");

        sut.create_session(CheckoutInput {
            items:          vec![item("マグカップ", 1200, 1)],
            customer_email: Some("  ".to_string()),
        })
        .await
        .unwrap();

        assert_eq!(gateway.requests()[0].customer_email, None);
    }

    #[tokio::test]
    async fn test_不正なカートではゲートウェイを呼ばない() {
        let gateway = MockPaymentGateway::new();
        let sut = CheckoutUseCaseImpl::new(Arc::new(gateway.clone()), "usd");

        let empty = sut
            .create_session(CheckoutInput {
                items:          vec![],
                customer_email: None,
            })
            .await;
        let zero_price = sut
            .create_session(CheckoutInput {
                items:          vec![item("マグカップ", 0, 1)],
                customer_email: None,
            })
            .await;
        let too_many = sut
            .create_session(CheckoutInput {
                items:          vec![item("マグカップ", 1200, 100)],
                customer_email: None,
            })
            .await;

        assert!(matches!(empty, Err(ShopError::BadRequest(_))));
        assert!(matches!(zero_price, Err(ShopError::BadRequest(_))));
        assert!(matches!(too_many, Err(ShopError::BadRequest(_))));
        assert!(gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_ゲートウェイの失敗はbad_gateway() {
        let sut = CheckoutUseCaseImpl::new(Arc::new(MockPaymentGateway::failing()), "usd");

        let result = sut
            .create_session(CheckoutInput {
                items:          vec![item("マグカップ", 1200, 1)],
                customer_email: None,
            })
            .await;

        assert!(matches!(result, Err(ShopError::BadGateway(_))));
    }
}
