//! # 配送ユースケース
//!
//! 追跡照会とラベル作成を配送キャリアに委譲する。

use std::sync::Arc;

use storefront_domain::{
    order::UnverifiedShipping,
    shipping::{LabelFormat, LabelRequest, ShipmentLabel, TrackingInfo, TrackingNumber},
};
use storefront_infra::shipping::ShippingCarrier;
use storefront_shared::{event_log::event, log_business_event};

use crate::error::ShopError;

/// ラベル作成の入力
pub struct CreateLabelInput {
    pub recipient:    UnverifiedShipping,
    pub weight_grams: i64,
    pub label_format: Option<LabelFormat>,
}

/// 配送ユースケース
pub struct ShippingUseCaseImpl {
    carrier: Arc<dyn ShippingCarrier>,
}

impl ShippingUseCaseImpl {
    pub fn new(carrier: Arc<dyn ShippingCarrier>) -> Self {
        Self { carrier }
    }

    pub async fn track(&self, tracking_number: &str) -> Result<TrackingInfo, ShopError> {
        let tracking_number = TrackingNumber::new(tracking_number)?;
        let info = self.carrier.track(&tracking_number).await?;

        log_business_event!(
            event.category = event::category::SHIPPING,
            event.action = event::action::TRACKING_FETCHED,
            event.entity_type = event::entity_type::SHIPMENT,
            event.entity_id = %info.tracking_number,
            event.result = event::result::SUCCESS,
            shipment.status = %info.status,
            "追跡情報を取得しました"
        );

        Ok(info)
    }

    /// 配送ラベルを作成する
    ///
    /// 形式の指定がなければ PDF。
    pub async fn create_label(&self, input: CreateLabelInput) -> Result<ShipmentLabel, ShopError> {
        let request = LabelRequest::new(
            &input.recipient,
            input.weight_grams,
            input.label_format.unwrap_or_default(),
        )?;
        let label = self.carrier.create_label(&request).await?;

        log_business_event!(
            event.category = event::category::SHIPPING,
            event.action = event::action::LABEL_CREATED,
            event.entity_type = event::entity_type::SHIPMENT,
            event.entity_id = %label.tracking_number,
            event.result = event::result::SUCCESS,
            shipment.label_format = %label.label_format,
            shipment.weight_grams = request.weight_grams(),
            "配送ラベルを作成しました"
        );

        Ok(label)
    }
}
