//! 外部通信を行わない配送キャリア
//!
//! 追跡照会は固定の履歴を返し、ラベルの追跡番号はインスタンス内の連番で採番する。

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use storefront_domain::shipping::{
    LabelRequest,
    ShipmentLabel,
    TrackingEvent,
    TrackingInfo,
    TrackingNumber,
    TrackingStatus,
};

use super::{ShippingCarrier, ShippingError};

/// "STUB SHIPPING LABEL" の Base64
const PLACEHOLDER_LABEL: &str = "U1RVQiBTSElQUElORyBMQUJFTA==";

/// 固定応答の配送キャリア
#[derive(Debug, Default)]
pub struct StubShippingCarrier {
    label_sequence: AtomicU64,
}

impl StubShippingCarrier {
    pub fn new() -> Self {
        Self::default()
    }
}

/// スタブ応答の基準時刻（2024-01-02T09:00:00Z）
fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_186_000, 0).unwrap_or_default()
}

#[async_trait]
impl ShippingCarrier for StubShippingCarrier {
    async fn track(&self, tracking_number: &TrackingNumber) -> Result<TrackingInfo, ShippingError> {
        let picked_up = base_time();

        Ok(TrackingInfo {
            tracking_number:    tracking_number.clone(),
            status:             TrackingStatus::InTransit,
            estimated_delivery: NaiveDate::from_ymd_opt(2024, 1, 5),
            events:             vec![
                TrackingEvent {
                    occurred_at: picked_up + Duration::hours(14),
                    description: "Arrived at sort facility".to_string(),
                    location:    Some("MEMPHIS, TN".to_string()),
                },
                TrackingEvent {
                    occurred_at: picked_up,
                    description: "Picked up".to_string(),
                    location:    None,
                },
            ],
        })
    }

    async fn create_label(&self, request: &LabelRequest) -> Result<ShipmentLabel, ShippingError> {
        let sequence = self.label_sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let tracking_number = TrackingNumber::new(format!("STUB{sequence:012}"))
            .map_err(|e| ShippingError::InvalidResponse(e.to_string()))?;

        Ok(ShipmentLabel {
            tracking_number,
            label_format: request.label_format(),
            label_data: PLACEHOLDER_LABEL.to_string(),
        })
    }
}
