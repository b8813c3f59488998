//! # 配送
//!
//! 配送キャリアとのやりとりに使う値オブジェクト。
//! 住所検証や運賃見積もりは扱わない。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::{
    DomainError,
    order::{ShippingDetails, UnverifiedShipping},
};

/// 追跡番号の文字数範囲
const TRACKING_NUMBER_LENGTH: std::ops::RangeInclusive<usize> = 8..=40;

/// 追跡番号（値オブジェクト）
///
/// trim と大文字化を行った上で、8〜40 文字の英数字であることを検証する。
///
/// ```rust
/// use storefront_domain::shipping::TrackingNumber;
///
/// let number = TrackingNumber::new(" 1z999aa10123456784 ").unwrap();
/// assert_eq!(number.as_str(), "1Z999AA10123456784");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingNumber(String);

impl TrackingNumber {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_ascii_uppercase();

        if !TRACKING_NUMBER_LENGTH.contains(&value.len()) {
            return Err(DomainError::Validation(format!(
                "追跡番号は {} 〜 {} 文字である必要があります",
                TRACKING_NUMBER_LENGTH.start(),
                TRACKING_NUMBER_LENGTH.end()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::Validation(
                "追跡番号は英数字のみ使用できます".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TrackingNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 配送状況
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackingStatus {
    LabelCreated,
    InTransit,
    OutForDelivery,
    Delivered,
    Exception,
    Unknown,
}

impl TrackingStatus {
    /// キャリアの状況コードから変換する
    ///
    /// 未知のコードは `Unknown`。
    pub fn from_carrier_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "OC" | "LC" => Self::LabelCreated,
            "IT" | "PU" | "AR" | "DP" => Self::InTransit,
            "OD" => Self::OutForDelivery,
            "DL" => Self::Delivered,
            "DE" | "SE" | "CA" => Self::Exception,
            _ => Self::Unknown,
        }
    }
}

/// 追跡履歴の 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingEvent {
    pub occurred_at: DateTime<Utc>,
    pub description: String,
    pub location:    Option<String>,
}

/// 追跡情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingInfo {
    pub tracking_number:    TrackingNumber,
    pub status:             TrackingStatus,
    pub estimated_delivery: Option<NaiveDate>,
    /// 新しい順
    pub events:             Vec<TrackingEvent>,
}

/// ラベル形式
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LabelFormat {
    #[default]
    Pdf,
    Png,
    Zpl,
}

/// 荷物重量の上限（グラム）
pub const MAX_PACKAGE_WEIGHT_GRAMS: i64 = 68_000;

/// ラベル作成リクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRequest {
    recipient:     ShippingDetails,
    weight_grams:  u32,
    label_format:  LabelFormat,
}

impl LabelRequest {
    /// # Errors
    ///
    /// 配送先の不備、または重量が 1〜68000 g の範囲外の場合は `DomainError::Validation`。
    pub fn new(
        recipient: &UnverifiedShipping,
        weight_grams: i64,
        label_format: LabelFormat,
    ) -> Result<Self, DomainError> {
        let recipient = ShippingDetails::validate(Some(recipient)).map_err(|problems| {
            let messages: Vec<String> = problems.iter().map(ToString::to_string).collect();
            DomainError::Validation(messages.join(", "))
        })?;

        let weight_grams = u32::try_from(weight_grams)
            .ok()
            .filter(|w| *w >= 1 && i64::from(*w) <= MAX_PACKAGE_WEIGHT_GRAMS)
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "重量は 1 以上 {MAX_PACKAGE_WEIGHT_GRAMS} グラム以下である必要があります"
                ))
            })?;

        Ok(Self {
            recipient,
            weight_grams,
            label_format,
        })
    }

    pub fn recipient(&self) -> &ShippingDetails {
        &self.recipient
    }

    pub fn weight_grams(&self) -> u32 {
        self.weight_grams
    }

    pub fn label_format(&self) -> LabelFormat {
        self.label_format
    }
}

/// 作成された配送ラベル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentLabel {
    pub tracking_number: TrackingNumber,
    pub label_format:    LabelFormat,
    /// Base64 エンコードされたラベル本体
    pub label_data:      String,
}
