use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// Delivery product sold by the partner carrying the last leg.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryMethod {
    ParcelExpress,
    AirExpress,
    AirEconomy,
    LandRail,
    LandRoadExpress,
    LandRoadEconomy,
    LandContainer,
    Water,
    LandRoadCommon,
}

impl DeliveryMethod {
    /// Chinese name printed on partner labels
    pub fn zh(&self) -> &'static str {
        match self {
            DeliveryMethod::ParcelExpress => "速递快递",
            DeliveryMethod::AirExpress => "快空",
            DeliveryMethod::AirEconomy => "慢空",
            DeliveryMethod::LandRail => "铁路",
            DeliveryMethod::LandRoadExpress => "快汽运",
            DeliveryMethod::LandRoadEconomy => "慢汽运",
            DeliveryMethod::LandContainer => "陆运集装箱",
            DeliveryMethod::Water => "海运",
            DeliveryMethod::LandRoadCommon => "普通汽运",
        }
    }
}

pub const UNKNOWN_ZH: &str = "无知";

pub fn delivery_method_zh(method: Option<DeliveryMethod>) -> &'static str {
    method.map(|m| m.zh()).unwrap_or(UNKNOWN_ZH)
}

pub fn bool_zh(value: bool) -> &'static str {
    if value {
        "是"
    } else {
        "否"
    }
}

/// Declared cargo value; zero means the mandatory insurance only.
pub fn cargo_value_zh(value: Decimal) -> String {
    if value.is_zero() {
        return "义务保险".to_string();
    }
    format!(
        "{} 美元",
        value.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone_number: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartnerInfo {
    pub code: String,
    #[serde(rename = "transport_method")]
    pub delivery_method: Option<DeliveryMethod>,
    pub product_name: String,
    pub recipient: Recipient,
    pub cargo_value: Decimal,
}
