use rust_decimal::{Decimal, RoundingStrategy};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use crate::store::fields;

const CM3_PER_M3: i64 = 1_000_000;

/// Rounds a physical figure to 2 decimal places.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// One physical package of a shipment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UnitLoad {
    /// 1-based position within the shipment
    pub sequence: i64,
    pub quantity: i64,
    pub product_name: String,
    /// kg
    pub weight: Decimal,
    /// cm
    pub length: u32,
    pub height: u32,
    pub width: u32,
    #[serde(skip)]
    pub record_id: i64,
}

impl UnitLoad {
    /// Volume in m³, zero when any dimension is zero.
    pub fn cubage(&self) -> Decimal {
        if self.length == 0 || self.height == 0 || self.width == 0 {
            return Decimal::ZERO;
        }
        let cm3 = Decimal::from(u64::from(self.length) * u64::from(self.height))
            * Decimal::from(self.width);
        round2(cm3 / Decimal::from(CM3_PER_M3))
    }
}

impl Serialize for UnitLoad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(9))?;
        map.serialize_entry("sequence", &self.sequence)?;
        map.serialize_entry("quantity", &self.quantity)?;
        map.serialize_entry("product_name", &self.product_name)?;
        map.serialize_entry("weight", &self.weight)?;
        map.serialize_entry("length", &self.length)?;
        map.serialize_entry("height", &self.height)?;
        map.serialize_entry("width", &self.width)?;
        map.serialize_entry("cubage", &self.cubage())?;
        map.end()
    }
}

/// Unit load row as stored by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendUnitLoad {
    #[serde(rename = "SequenceNumber", default, deserialize_with = "fields::int")]
    pub sequence: i64,
    #[serde(rename = "Quantity", default, deserialize_with = "fields::int")]
    pub quantity: i64,
    #[serde(rename = "SD_ProductName", default, deserialize_with = "fields::string")]
    pub product_name: String,
    #[serde(rename = "SD_Weight", default, deserialize_with = "fields::decimal")]
    pub weight: Decimal,
    #[serde(rename = "SD_Length", default, deserialize_with = "fields::int")]
    pub length: i64,
    #[serde(rename = "SD_Height", default, deserialize_with = "fields::int")]
    pub height: i64,
    #[serde(rename = "SD_Width", default, deserialize_with = "fields::int")]
    pub width: i64,
    #[serde(rename = "recordId", default, deserialize_with = "fields::int")]
    pub record_id: i64,
}

fn dimension(cm: i64) -> u32 {
    u32::try_from(cm.max(0)).unwrap_or(u32::MAX)
}

impl BackendUnitLoad {
    pub fn to_domain(&self) -> UnitLoad {
        UnitLoad {
            sequence: self.sequence,
            quantity: self.quantity,
            product_name: self.product_name.clone(),
            weight: self.weight,
            length: dimension(self.length),
            height: dimension(self.height),
            width: dimension(self.width),
            record_id: self.record_id,
        }
    }
}
