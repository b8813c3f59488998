//! # 注文
//!
//! チェックアウト時のカート検証と、決済完了後の配送先検証を扱う。
//!
//! 金額はすべて通貨の最小単位（セントなど）の整数で表す。

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::{DomainError, value_objects::EmailAddress};

/// カートに入れられる明細の最大数
pub const MAX_CART_ITEMS: usize = 50;
/// 1 明細あたりの最大数量
pub const MAX_ITEM_QUANTITY: i64 = 99;

define_validated_string! {
    /// 明細の商品名（1〜200 文字）
    pub struct ItemName {
        label: "商品名",
        max_length: 200,
    }
}

define_validated_string! {
    /// 配送先の受取人名
    pub struct RecipientName {
        label: "受取人名",
        max_length: 200,
        pii: true,
    }
}

// =========================================================================
// Cart（カート）
// =========================================================================

/// カート明細
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItem {
    name:        ItemName,
    unit_amount: u64,
    quantity:    u32,
}

impl CartItem {
    /// # Errors
    ///
    /// - 単価が 0 以下
    /// - 数量が 1〜99 の範囲外
    pub fn new(name: ItemName, unit_amount: i64, quantity: i64) -> Result<Self, DomainError> {
        let unit_amount = u64::try_from(unit_amount)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| {
                DomainError::Validation(format!("{name} の単価は 1 以上である必要があります"))
            })?;

        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| (1..=MAX_ITEM_QUANTITY as u32).contains(q))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "{name} の数量は 1 以上 {MAX_ITEM_QUANTITY} 以下である必要があります"
                ))
            })?;

        Ok(Self {
            name,
            unit_amount,
            quantity,
        })
    }

    pub fn name(&self) -> &ItemName {
        &self.name
    }

    pub fn unit_amount(&self) -> u64 {
        self.unit_amount
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn subtotal(&self) -> u64 {
        self.unit_amount.saturating_mul(u64::from(self.quantity))
    }
}

/// チェックアウト対象のカート
///
/// 1〜50 明細。購入者メールアドレスは任意（決済ページで入力させる）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cart {
    items:          Vec<CartItem>,
    customer_email: Option<EmailAddress>,
}

impl Cart {
    pub fn new(
        items: Vec<CartItem>,
        customer_email: Option<EmailAddress>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::Validation(
                "カートに商品がありません".to_string(),
            ));
        }
        if items.len() > MAX_CART_ITEMS {
            return Err(DomainError::Validation(format!(
                "カートの明細は {MAX_CART_ITEMS} 件以内である必要があります"
            )));
        }
        Ok(Self {
            items,
            customer_email,
        })
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn customer_email(&self) -> Option<&EmailAddress> {
        self.customer_email.as_ref()
    }

    pub fn total_amount(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, item| acc.saturating_add(item.subtotal()))
    }
}

// =========================================================================
// 配送先
// =========================================================================

/// 決済プロバイダから受け取った未検証の配送先
///
/// どのフィールドも欠落しうる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UnverifiedShipping {
    pub name:        Option<String>,
    pub line1:       Option<String>,
    pub line2:       Option<String>,
    pub city:        Option<String>,
    pub state:       Option<String>,
    pub postal_code: Option<String>,
    pub country:     Option<String>,
}

/// 配送先の不備
///
/// `IntoStaticStr` はログ用のコード（`missing_line1` など）を返す。
#[derive(Debug, Clone, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ShippingProblem {
    /// 配送先情報そのものが無い
    #[error("配送先情報がありません")]
    MissingShippingDetails,
    #[error("受取人名がありません")]
    MissingRecipientName,
    #[error("住所 1 行目がありません")]
    MissingLine1,
    #[error("市区町村がありません")]
    MissingCity,
    #[error("郵便番号がありません")]
    MissingPostalCode,
    #[error("国コードがありません")]
    MissingCountry,
    /// ISO 3166-1 alpha-2 ではない
    #[error("国コードが不正です: {0}")]
    InvalidCountry(String),
}

/// 検証済みの配送先
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShippingDetails {
    recipient:   RecipientName,
    line1:       String,
    line2:       Option<String>,
    city:        String,
    state:       Option<String>,
    postal_code: String,
    country:     String,
}

impl ShippingDetails {
    /// 配送先を検証する
    ///
    /// 不備はすべて列挙して返す（最初の 1 件で打ち切らない）。
    pub fn validate(input: Option<&UnverifiedShipping>) -> Result<Self, Vec<ShippingProblem>> {
        let Some(input) = input else {
            return Err(vec![ShippingProblem::MissingShippingDetails]);
        };

        let mut problems = Vec::new();

        let recipient = non_blank(&input.name).and_then(|n| RecipientName::new(n).ok());
        if recipient.is_none() {
            problems.push(ShippingProblem::MissingRecipientName);
        }
        let line1 = non_blank(&input.line1);
        if line1.is_none() {
            problems.push(ShippingProblem::MissingLine1);
        }
        let city = non_blank(&input.city);
        if city.is_none() {
            problems.push(ShippingProblem::MissingCity);
        }
        let postal_code = non_blank(&input.postal_code);
        if postal_code.is_none() {
            problems.push(ShippingProblem::MissingPostalCode);
        }
        let country = match non_blank(&input.country) {
            None => {
                problems.push(ShippingProblem::MissingCountry);
                None
            }
            Some(c) if is_alpha2(&c) => Some(c.to_ascii_uppercase()),
            Some(c) => {
                problems.push(ShippingProblem::InvalidCountry(c));
                None
            }
        };

        match (recipient, line1, city, postal_code, country) {
            (Some(recipient), Some(line1), Some(city), Some(postal_code), Some(country)) => {
                Ok(Self {
                    recipient,
                    line1,
                    line2: non_blank(&input.line2),
                    city,
                    state: non_blank(&input.state),
                    postal_code,
                    country,
                })
            }
            _ => Err(problems),
        }
    }

    pub fn recipient(&self) -> &RecipientName {
        &self.recipient
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> Option<&str> {
        self.line2.as_deref()
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn is_alpha2(code: &str) -> bool {
    code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())
}

// =========================================================================
// PaidOrder（決済完了した注文）
// =========================================================================

/// 決済完了イベントから組み立てた注文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidOrder {
    pub session_id:     String,
    pub customer_email: Option<EmailAddress>,
    pub customer_name:  Option<String>,
    /// 通貨の最小単位での合計金額
    pub amount_total:   u64,
    /// ISO 4217 通貨コード（小文字）
    pub currency:       String,
}

/// 最小単位の金額を表示用文字列に変換する（`1999, "usd"` → `"19.99 USD"`）
///
/// 小数部を持たない通貨は考慮しない。
pub fn format_amount(amount: u64, currency: &str) -> String {
    format!(
        "{}.{:02} {}",
        amount / 100,
        amount % 100,
        currency.to_ascii_uppercase()
    )
}
