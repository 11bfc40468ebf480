use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use strum::{AsRefStr, EnumIter, EnumString};
use thiserror::Error;
use tracing::warn;

use super::entry::{BackendEntry, Entry};
use super::note::{BackendNote, Note};
use super::partner_info::{PartnerInfo, Recipient};
use super::unit_load::{round2, BackendUnitLoad, UnitLoad};
use crate::store::{fields, Record, StoreError};

/// Consolidated shipments nested deeper than this are not decoded.
pub const MAX_CONSOLIDATION_DEPTH: usize = 10;

pub const UNKNOWN_TRANSFER_POINT: &str = "unknown";

/// Related-record portals decoded into a shipment.
pub const SHIPMENT_PORTALS: [&str; 4] = [
    "TO2b_Shipments||ShipmentDetails",
    "TO2c_Shipments||Entries",
    "TO2k_Shipments||Shipments||Child",
    "TO2d_Shipments||Notes",
];

/// Linear shipment lifecycle. `Invalid` is the terminal sentinel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, AsRefStr,
    EnumIter, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentStatus {
    Planning,
    Preparation,
    Packed,
    SentOut,
    CustomsClearance,
    #[serde(rename = "on_the_way_to_tp")]
    #[strum(serialize = "on_the_way_to_tp")]
    OnTheWayToTp,
    #[serde(rename = "delivered_to_tp")]
    #[strum(serialize = "delivered_to_tp")]
    DeliveredToTp,
    DeliveredToRecipient,
    Invalid,
}

impl ShipmentStatus {
    const SEQUENCE: [ShipmentStatus; 8] = [
        ShipmentStatus::Planning,
        ShipmentStatus::Preparation,
        ShipmentStatus::Packed,
        ShipmentStatus::SentOut,
        ShipmentStatus::CustomsClearance,
        ShipmentStatus::OnTheWayToTp,
        ShipmentStatus::DeliveredToTp,
        ShipmentStatus::DeliveredToRecipient,
    ];

    /// Backend status number.
    pub fn key(&self) -> i64 {
        match self {
            ShipmentStatus::Invalid => 999,
            other => Self::SEQUENCE
                .iter()
                .position(|s| s == other)
                .map(|p| p as i64)
                .unwrap_or(999),
        }
    }

    pub fn from_key(key: i64) -> Self {
        usize::try_from(key)
            .ok()
            .and_then(|i| Self::SEQUENCE.get(i).copied())
            .unwrap_or(ShipmentStatus::Invalid)
    }

    /// The only status this one may change to.
    pub fn next_valid(&self) -> ShipmentStatus {
        match self {
            ShipmentStatus::DeliveredToRecipient | ShipmentStatus::Invalid => {
                ShipmentStatus::Invalid
            }
            other => ShipmentStatus::from_key(other.key() + 1),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentType {
    CommonShipment,
    ConsolidationShipment,
}

impl ShipmentType {
    pub fn from_key(key: i64) -> Option<Self> {
        match key {
            0 => Some(ShipmentType::CommonShipment),
            1 => Some(ShipmentType::ConsolidationShipment),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportMethod {
    Air,
    Auto,
    Train,
    Express,
    Sea,
    Local,
}

impl TransportMethod {
    pub fn from_key(key: i64) -> Option<Self> {
        match key {
            0 => Some(TransportMethod::Air),
            1 => Some(TransportMethod::Auto),
            2 => Some(TransportMethod::Train),
            3 => Some(TransportMethod::Express),
            4 => Some(TransportMethod::Sea),
            5 => Some(TransportMethod::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShipmentError {
    #[error("cannot change shipment status from {from} to {to}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },
    #[error("unit loads can only be added in {required} status, shipment is {current}")]
    InvalidState {
        current: ShipmentStatus,
        required: ShipmentStatus,
    },
}

/// Outbound shipment with its packages, entries and consolidated children.
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub id: String,
    pub code: String,
    pub shipment_type: Option<ShipmentType>,
    pub customer_code: String,
    pub packages_qty: i64,
    pub pieces_qty: i64,
    pub status: ShipmentStatus,
    pub transfer_point: String,
    pub transport_method: Option<TransportMethod>,
    pub package_method: String,
    pub package_method_zh: String,
    pub departure_warehouse: String,
    pub arrival_warehouse: String,
    pub transfer_point_warehouse: String,
    pub date_created: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub unit_loads: Vec<UnitLoad>,
    pub entries: Vec<Entry>,
    pub consolidation: Vec<Shipment>,
    pub record_id: i64,
    pub image_urls: Vec<String>,
    pub partner_info: PartnerInfo,
    pub need_declare: bool,
    pub notes: Vec<Note>,
}

impl Shipment {
    /// Empty shipment in `Planning`.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            code: code.into(),
            shipment_type: Some(ShipmentType::CommonShipment),
            customer_code: String::new(),
            packages_qty: 0,
            pieces_qty: 0,
            status: ShipmentStatus::Planning,
            transfer_point: UNKNOWN_TRANSFER_POINT.to_string(),
            transport_method: None,
            package_method: String::new(),
            package_method_zh: String::new(),
            departure_warehouse: String::new(),
            arrival_warehouse: String::new(),
            transfer_point_warehouse: String::new(),
            date_created: None,
            date_modified: None,
            unit_loads: Vec::new(),
            entries: Vec::new(),
            consolidation: Vec::new(),
            record_id: 0,
            image_urls: Vec::new(),
            partner_info: PartnerInfo::default(),
            need_declare: false,
            notes: Vec::new(),
        }
    }

    /// Total weight in kg.
    pub fn weight(&self) -> Decimal {
        round2(self.unit_loads.iter().map(|ul| ul.weight).sum())
    }

    /// Total volume in m³.
    pub fn cubage(&self) -> Decimal {
        round2(self.unit_loads.iter().map(UnitLoad::cubage).sum())
    }

    /// kg/m³, zero when the cubage is zero.
    pub fn density(&self) -> Decimal {
        let cubage = self.cubage();
        if cubage.is_zero() {
            return Decimal::ZERO;
        }
        round2(self.weight() / cubage)
    }

    pub fn change_status(&mut self, target: ShipmentStatus) -> Result<(), ShipmentError> {
        let next = self.status.next_valid();
        if next == ShipmentStatus::Invalid || target != next {
            return Err(ShipmentError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    pub fn add_unit_load(&mut self, unit_load: UnitLoad) -> Result<(), ShipmentError> {
        if self.status != ShipmentStatus::Preparation {
            return Err(ShipmentError::InvalidState {
                current: self.status,
                required: ShipmentStatus::Preparation,
            });
        }
        self.unit_loads.push(unit_load);
        Ok(())
    }
}

impl Serialize for Shipment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("code", &self.code)?;
        map.serialize_entry("type", &self.shipment_type)?;
        map.serialize_entry("customer_code", &self.customer_code)?;
        map.serialize_entry("packages_qty", &self.packages_qty)?;
        map.serialize_entry("pieces_qty", &self.pieces_qty)?;
        map.serialize_entry("current_status", &self.status)?;
        map.serialize_entry("transfer_point", &self.transfer_point)?;
        map.serialize_entry("transport_method", &self.transport_method)?;
        map.serialize_entry("package_method", &self.package_method)?;
        map.serialize_entry("package_method_zh", &self.package_method_zh)?;
        map.serialize_entry("departure_warehouse", &self.departure_warehouse)?;
        map.serialize_entry("arrival_warehouse", &self.arrival_warehouse)?;
        map.serialize_entry("transfer_point_warehouse", &self.transfer_point_warehouse)?;
        map.serialize_entry("date_created", &self.date_created)?;
        map.serialize_entry("date_modified", &self.date_modified)?;
        map.serialize_entry("unit_loads", &self.unit_loads)?;
        map.serialize_entry("entries", &self.entries)?;
        map.serialize_entry("consolidation", &self.consolidation)?;
        map.serialize_entry("record_id", &self.record_id)?;
        map.serialize_entry("image_urls", &self.image_urls)?;
        map.serialize_entry("partner_info", &self.partner_info)?;
        map.serialize_entry("need_declare", &self.need_declare)?;
        map.serialize_entry("notes", &self.notes)?;
        map.serialize_entry("weight", &self.weight())?;
        map.serialize_entry("cubage", &self.cubage())?;
        map.serialize_entry("density", &self.density())?;
        map.end()
    }
}

/// Transfer point number to name table.
#[derive(Debug, Clone, Default)]
pub struct TransferPoints(HashMap<i64, String>);

impl TransferPoints {
    /// Keys that are not integers are skipped.
    pub fn from_config(table: &HashMap<String, String>) -> Self {
        Self(
            table
                .iter()
                .filter_map(|(k, v)| k.trim().parse::<i64>().ok().map(|k| (k, v.clone())))
                .collect(),
        )
    }

    pub fn name(&self, key: i64) -> String {
        self.0
            .get(&key)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TRANSFER_POINT.to_string())
    }
}

/// Shipment as stored by the backend, related rows included.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendShipment {
    #[serde(rename = "Id_shipment", default, deserialize_with = "fields::string")]
    pub id: String,
    #[serde(default, deserialize_with = "fields::string")]
    pub code: String,
    #[serde(rename = "CargoType_number", default, deserialize_with = "fields::int")]
    pub cargo_type: i64,
    #[serde(rename = "CustomerCode", default, deserialize_with = "fields::string")]
    pub customer_code: String,
    #[serde(rename = "PackageQuantity", default, deserialize_with = "fields::int")]
    pub packages_qty: i64,
    #[serde(rename = "TotalQuanity", default, deserialize_with = "fields::int")]
    pub pieces_qty: i64,
    #[serde(rename = "ShipmentStatus_number", default, deserialize_with = "fields::int")]
    pub status_key: i64,
    #[serde(rename = "TransferPoint_number", default, deserialize_with = "fields::int")]
    pub transfer_point_key: i64,
    #[serde(rename = "TransportationMethod_number", default, deserialize_with = "fields::int")]
    pub transport_method_key: i64,
    #[serde(default, deserialize_with = "fields::string")]
    pub package_method: String,
    #[serde(rename = "shipments_package_method::locale_zh", default, deserialize_with = "fields::string")]
    pub package_method_zh: String,
    #[serde(rename = "Departure_Warehouse", default, deserialize_with = "fields::string")]
    pub departure_warehouse: String,
    #[serde(rename = "Arrival_Warehouse", default, deserialize_with = "fields::string")]
    pub arrival_warehouse: String,
    #[serde(rename = "TransferPoint_Warehouse", default, deserialize_with = "fields::string")]
    pub transfer_point_warehouse: String,
    #[serde(rename = "Date_Created", default, deserialize_with = "fields::timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(rename = "Date_Modified_Timestamp", default, deserialize_with = "fields::timestamp")]
    pub date_modified: Option<DateTime<Utc>>,
    #[serde(rename = "TO2b_Shipments||ShipmentDetails", default)]
    pub unit_loads: Vec<BackendUnitLoad>,
    #[serde(rename = "TO2c_Shipments||Entries", default)]
    pub entries: Vec<BackendEntry>,
    #[serde(rename = "TO2k_Shipments||Shipments||Child", default)]
    pub consolidation: Vec<BackendShipment>,
    #[serde(rename = "TO2d_Shipments||Notes", default)]
    pub notes: Vec<BackendNote>,
    #[serde(rename = "Container", default, deserialize_with = "fields::string_list")]
    pub image_urls: Vec<String>,
    #[serde(rename = "Partners||PartnerCode", default, deserialize_with = "fields::string")]
    pub partner_code: String,
    #[serde(rename = "first_unit_load_product_name", default, deserialize_with = "fields::string")]
    pub partner_product_name: String,
    #[serde(rename = "Partners||RecipientFullName", default, deserialize_with = "fields::string")]
    pub partner_recipient_name: String,
    #[serde(rename = "Partners||RecipientPhoneNumber", default, deserialize_with = "fields::string")]
    pub partner_recipient_phone: String,
    #[serde(rename = "Partners||RecipientDestinationPoint", default, deserialize_with = "fields::string")]
    pub partner_recipient_destination: String,
    #[serde(rename = "partner_transport_method", default, deserialize_with = "fields::opt_string")]
    pub partner_transport_method: Option<String>,
    #[serde(rename = "Partners||ValuesOfCargo", default, deserialize_with = "fields::decimal")]
    pub partner_cargo_value: Decimal,
    #[serde(default, deserialize_with = "fields::boolean")]
    pub need_declare: bool,
    #[serde(rename = "recordId", default, deserialize_with = "fields::int")]
    pub record_id: i64,
}

impl BackendShipment {
    pub fn from_record(record: &Record) -> Result<Self, StoreError> {
        let mut shipment: Self = record.decode()?;
        shipment.record_id = record.record_id;
        Ok(shipment)
    }

    pub fn to_domain(&self, transfer_points: &TransferPoints) -> Shipment {
        self.to_domain_at(transfer_points, 0)
    }

    fn to_domain_at(&self, transfer_points: &TransferPoints, depth: usize) -> Shipment {
        let consolidation = if depth + 1 >= MAX_CONSOLIDATION_DEPTH {
            if !self.consolidation.is_empty() {
                warn!(
                    code = %self.code,
                    depth,
                    dropped = self.consolidation.len(),
                    "consolidation nested too deep, children dropped"
                );
            }
            Vec::new()
        } else {
            self.consolidation
                .iter()
                .map(|child| child.to_domain_at(transfer_points, depth + 1))
                .collect()
        };

        Shipment {
            id: self.id.clone(),
            code: self.code.clone(),
            shipment_type: ShipmentType::from_key(self.cargo_type),
            customer_code: self.customer_code.clone(),
            packages_qty: self.packages_qty,
            pieces_qty: self.pieces_qty,
            status: ShipmentStatus::from_key(self.status_key),
            transfer_point: transfer_points.name(self.transfer_point_key),
            transport_method: TransportMethod::from_key(self.transport_method_key),
            package_method: self.package_method.clone(),
            package_method_zh: self.package_method_zh.clone(),
            departure_warehouse: self.departure_warehouse.clone(),
            arrival_warehouse: self.arrival_warehouse.clone(),
            transfer_point_warehouse: self.transfer_point_warehouse.clone(),
            date_created: self.date_created,
            date_modified: self.date_modified,
            unit_loads: self.unit_loads.iter().map(BackendUnitLoad::to_domain).collect(),
            entries: self.entries.iter().map(BackendEntry::to_domain).collect(),
            consolidation,
            record_id: self.record_id,
            image_urls: self.image_urls.clone(),
            partner_info: PartnerInfo {
                code: self.partner_code.clone(),
                delivery_method: self
                    .partner_transport_method
                    .as_deref()
                    .and_then(|m| m.parse().ok()),
                product_name: self.partner_product_name.clone(),
                recipient: Recipient {
                    name: self.partner_recipient_name.clone(),
                    phone_number: self.partner_recipient_phone.clone(),
                    destination: self.partner_recipient_destination.clone(),
                },
                cargo_value: self.partner_cargo_value,
            },
            need_declare: self.need_declare,
            notes: self.notes.iter().map(BackendNote::to_domain).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::partner_info::DeliveryMethod;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use strum::IntoEnumIterator;

    fn unit(weight: Decimal, l: u32, h: u32, w: u32) -> UnitLoad {
        UnitLoad {
            sequence: 1,
            quantity: 1,
            weight,
            length: l,
            height: h,
            width: w,
            ..Default::default()
        }
    }

    #[test]
    fn status_keys_follow_backend_numbers() {
        assert_eq!(ShipmentStatus::Planning.key(), 0);
        assert_eq!(ShipmentStatus::DeliveredToRecipient.key(), 7);
        assert_eq!(ShipmentStatus::Invalid.key(), 999);
        assert_eq!(ShipmentStatus::from_key(1), ShipmentStatus::Preparation);
        assert_eq!(ShipmentStatus::from_key(42), ShipmentStatus::Invalid);
        assert_eq!(ShipmentStatus::from_key(-1), ShipmentStatus::Invalid);
    }

    #[test]
    fn every_status_except_last_has_a_successor() {
        for status in ShipmentStatus::iter().filter(|s| {
            *s != ShipmentStatus::DeliveredToRecipient && *s != ShipmentStatus::Invalid
        }) {
            let mut shipment = Shipment::new("SPN1");
            shipment.status = status;
            let next = status.next_valid();
            assert_eq!(next.key(), status.key() + 1);
            assert!(shipment.change_status(next).is_ok());
            assert_eq!(shipment.status, next);
        }
    }

    #[test]
    fn skipping_backwards_and_self_transitions_fail() {
        let mut shipment = Shipment::new("SPN1");
        shipment.status = ShipmentStatus::Packed;

        for target in [
            ShipmentStatus::Packed,
            ShipmentStatus::Preparation,
            ShipmentStatus::CustomsClearance,
            ShipmentStatus::Invalid,
        ] {
            assert_eq!(
                shipment.change_status(target),
                Err(ShipmentError::InvalidTransition {
                    from: ShipmentStatus::Packed,
                    to: target
                })
            );
        }
        assert_eq!(shipment.status, ShipmentStatus::Packed);
    }

    #[test]
    fn delivered_to_recipient_is_terminal() {
        let mut shipment = Shipment::new("SPN1");
        shipment.status = ShipmentStatus::DeliveredToRecipient;
        assert_eq!(
            ShipmentStatus::DeliveredToRecipient.next_valid(),
            ShipmentStatus::Invalid
        );
        for target in ShipmentStatus::iter() {
            assert!(shipment.change_status(target).is_err());
        }
    }

    #[test]
    fn unit_loads_only_in_preparation() {
        let mut shipment = Shipment::new("SPN1");
        assert!(matches!(
            shipment.add_unit_load(unit(dec!(1), 1, 1, 1)),
            Err(ShipmentError::InvalidState { .. })
        ));

        shipment.change_status(ShipmentStatus::Preparation).unwrap();
        shipment.add_unit_load(unit(dec!(1), 1, 1, 1)).unwrap();
        shipment.change_status(ShipmentStatus::Packed).unwrap();
        assert!(shipment.add_unit_load(unit(dec!(1), 1, 1, 1)).is_err());
        assert_eq!(shipment.unit_loads.len(), 1);
    }

    #[test]
    fn physical_properties() {
        let mut shipment = Shipment::new("SPN1");
        shipment.status = ShipmentStatus::Preparation;
        shipment.add_unit_load(unit(dec!(50.55), 100, 33, 55)).unwrap();

        assert_eq!(shipment.weight(), dec!(50.55));
        assert_eq!(shipment.cubage(), dec!(0.18));
        assert_eq!(shipment.density(), dec!(280.83));
    }

    #[test]
    fn zero_cubage_gives_zero_density() {
        let mut shipment = Shipment::new("SPN1");
        shipment.unit_loads.push(unit(dec!(12.5), 0, 10, 10));
        assert_eq!(shipment.cubage(), Decimal::ZERO);
        assert_eq!(shipment.density(), Decimal::ZERO);
        assert_eq!(Shipment::new("empty").density(), Decimal::ZERO);
    }

    #[test]
    fn weight_has_no_float_drift() {
        let mut shipment = Shipment::new("SPN1");
        for _ in 0..10 {
            shipment.unit_loads.push(unit(dec!(0.1), 0, 0, 0));
        }
        assert_eq!(shipment.weight(), dec!(1.00));
    }

    #[test]
    fn backend_record_maps_to_domain() {
        let record = Record::new(
            5,
            json!({
                "Id_shipment": "77",
                "code": "SPN00123",
                "CargoType_number": 1,
                "CustomerCode": "CON",
                "ShipmentStatus_number": "1",
                "TransferPoint_number": 2,
                "TransportationMethod_number": "4",
                "Departure_Warehouse": "GZWH2",
                "Date_Created": "05/02/2024 10:00:00",
                "Partners||PartnerCode": "P-1",
                "partner_transport_method": "air_express",
                "Partners||ValuesOfCargo": "1500",
                "need_declare": 1,
                "TO2b_Shipments||ShipmentDetails": [
                    {"recordId": "9", "SequenceNumber": 1, "Quantity": 2, "SD_Weight": "50.55",
                     "SD_Length": 100, "SD_Height": 33, "SD_Width": 55}
                ],
                "TO2c_Shipments||Entries": [{"id": "1", "CustomerCode": "CON", "QuantityOfBoxes": 1}],
                "TO2d_Shipments||Notes": [{"Id_note": "n1", "NoteContent": "fragile"}],
                "TO2k_Shipments||Shipments||Child": [{"code": "SPN00124", "ShipmentStatus_number": 2}]
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        let mut table = HashMap::new();
        table.insert("2".to_string(), "Horgos".to_string());
        let shipment = BackendShipment::from_record(&record)
            .unwrap()
            .to_domain(&TransferPoints::from_config(&table));

        assert_eq!(shipment.record_id, 5);
        assert_eq!(shipment.status, ShipmentStatus::Preparation);
        assert_eq!(shipment.shipment_type, Some(ShipmentType::ConsolidationShipment));
        assert_eq!(shipment.transport_method, Some(TransportMethod::Sea));
        assert_eq!(shipment.transfer_point, "Horgos");
        assert_eq!(shipment.unit_loads[0].record_id, 9);
        assert_eq!(shipment.weight(), dec!(50.55));
        assert_eq!(shipment.entries[0].box_qty, 1);
        assert_eq!(shipment.notes[0].content, "fragile");
        assert_eq!(shipment.consolidation[0].status, ShipmentStatus::Packed);
        assert_eq!(
            shipment.partner_info.delivery_method,
            Some(DeliveryMethod::AirExpress)
        );
        assert_eq!(shipment.partner_info.cargo_value, dec!(1500));
        assert!(shipment.need_declare);
    }

    #[test]
    fn unknown_transfer_point_is_named_unknown() {
        let backend = BackendShipment {
            transfer_point_key: 99,
            ..Default::default()
        };
        assert_eq!(
            backend.to_domain(&TransferPoints::default()).transfer_point,
            UNKNOWN_TRANSFER_POINT
        );
    }

    #[test]
    fn consolidation_depth_is_capped() {
        let mut node = BackendShipment {
            code: "leaf".into(),
            ..Default::default()
        };
        for i in 0..(MAX_CONSOLIDATION_DEPTH + 5) {
            node = BackendShipment {
                code: format!("level-{}", i),
                consolidation: vec![node],
                ..Default::default()
            };
        }

        let shipment = node.to_domain(&TransferPoints::default());
        let mut depth = 1;
        let mut current = &shipment;
        while let Some(child) = current.consolidation.first() {
            depth += 1;
            current = child;
        }
        assert_eq!(depth, MAX_CONSOLIDATION_DEPTH);
    }

    #[test]
    fn json_includes_derived_figures() {
        let mut shipment = Shipment::new("SPN1");
        shipment.status = ShipmentStatus::Preparation;
        shipment.unit_loads.push(unit(dec!(50.55), 100, 33, 55));

        let json = serde_json::to_value(&shipment).unwrap();
        assert_eq!(json["weight"], json!("50.55"));
        assert_eq!(json["cubage"], json!("0.18"));
        assert_eq!(json["density"], json!("280.83"));
        assert_eq!(json["current_status"], json!("preparation"));
        assert_eq!(json["unit_loads"][0]["cubage"], json!("0.18"));
    }
}
