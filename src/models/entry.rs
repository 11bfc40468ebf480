use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};
use validator::Validate;

use crate::store::{fields, FieldValues, Record, StoreError};

/// Kind of goods received with an entry
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductCategory {
    HouseholdGoods,
    Clothes,
    Oversized,
}

/// Warehouse intake record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Entry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[validate(length(min = 1, message = "customer_code is required"))]
    pub customer_code: String,
    /// Unset until the entry is consolidated into a shipment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_code: Option<String>,
    #[serde(default)]
    pub status: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_entry: Option<DateTime<Utc>>,
    #[serde(default, rename = "source_of_entry")]
    pub source: String,
    #[serde(default)]
    pub track_code: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub box_qty: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub pcs_qty: i64,
    #[serde(default)]
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_category: Option<ProductCategory>,
    #[serde(default)]
    pub has_brand: bool,
    #[serde(default)]
    pub is_found_for_shipment: bool,
    #[serde(default)]
    pub warehouse: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    /// Backend record id, only used to target updates
    #[serde(skip)]
    pub record_id: i64,
}

impl Entry {
    /// Field set written on create and update. Every writable field is sent.
    pub fn field_values(&self) -> FieldValues {
        FieldValues::new()
            .set("CustomerCode", &self.customer_code)
            .set("SourceOfEntry", &self.source)
            .set("TrackCode", &self.track_code)
            .set("QuantityOfBoxes", self.box_qty)
            .set("PieceQuantity", self.pcs_qty)
            .set("ProductName", &self.product_name)
            .set("Warehouse", &self.warehouse)
            .set("is_found_for_shipment", i64::from(self.is_found_for_shipment))
            .set("has_brand", i64::from(self.has_brand))
            .set(
                "product_category",
                self.product_category.map(|c| c.to_string()).unwrap_or_default(),
            )
    }
}

/// Entry as stored by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendEntry {
    #[serde(default, deserialize_with = "fields::string")]
    pub id: String,
    #[serde(rename = "CustomerCode", default, deserialize_with = "fields::string")]
    pub customer_code: String,
    #[serde(rename = "Id_shipmentNumber", default, deserialize_with = "fields::opt_string")]
    pub shipment_number: Option<String>,
    #[serde(rename = "StatusOfEntry_key", default, deserialize_with = "fields::int")]
    pub status: i64,
    #[serde(rename = "Date_Created_Timestamp", default, deserialize_with = "fields::timestamp")]
    pub date_of_entry: Option<DateTime<Utc>>,
    #[serde(rename = "SourceOfEntry", default, deserialize_with = "fields::string")]
    pub source: String,
    #[serde(rename = "TrackCode", default, deserialize_with = "fields::string")]
    pub track_code: String,
    #[serde(rename = "QuantityOfBoxes", default, deserialize_with = "fields::int")]
    pub box_qty: i64,
    #[serde(rename = "PieceQuantity", default, deserialize_with = "fields::int")]
    pub pcs_qty: i64,
    #[serde(rename = "ProductName", default, deserialize_with = "fields::string")]
    pub product_name: String,
    #[serde(default, deserialize_with = "fields::opt_string")]
    pub product_category: Option<String>,
    #[serde(default, deserialize_with = "fields::boolean")]
    pub has_brand: bool,
    #[serde(default, deserialize_with = "fields::boolean")]
    pub is_found_for_shipment: bool,
    #[serde(rename = "Warehouse", default, deserialize_with = "fields::string")]
    pub warehouse: String,
    #[serde(rename = "Container", default, deserialize_with = "fields::string_list")]
    pub image_urls: Vec<String>,
    /// Present on related rows; top-level records take it from [`Record`]
    #[serde(rename = "recordId", default, deserialize_with = "fields::int")]
    pub record_id: i64,
}

impl BackendEntry {
    pub fn from_record(record: &Record) -> Result<Self, StoreError> {
        let mut entry: Self = record.decode()?;
        entry.record_id = record.record_id;
        Ok(entry)
    }

    pub fn to_domain(&self) -> Entry {
        Entry {
            id: self.id.clone(),
            customer_code: self.customer_code.clone(),
            shipment_code: self.shipment_number.clone(),
            status: self.status,
            date_of_entry: self.date_of_entry,
            source: self.source.clone(),
            track_code: self.track_code.clone(),
            box_qty: self.box_qty,
            pcs_qty: self.pcs_qty,
            product_name: self.product_name.clone(),
            product_category: self
                .product_category
                .as_deref()
                .and_then(|c| c.parse().ok()),
            has_brand: self.has_brand,
            is_found_for_shipment: self.is_found_for_shipment,
            warehouse: self.warehouse.clone(),
            image_urls: self.image_urls.clone(),
            record_id: self.record_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_record_maps_to_domain() {
        let record = Record::new(
            17,
            json!({
                "id": 1042,
                "CustomerCode": "CON",
                "Id_shipmentNumber": "",
                "StatusOfEntry_key": "2",
                "Date_Created_Timestamp": "05/02/2024 10:00:00",
                "TrackCode": "YT123",
                "QuantityOfBoxes": "3",
                "PieceQuantity": 40,
                "product_category": "clothes",
                "has_brand": 1,
                "Warehouse": "GZWH2",
                "Container": ""
            })
            .as_object()
            .cloned()
            .unwrap(),
        );

        let entry = BackendEntry::from_record(&record).unwrap().to_domain();
        assert_eq!(entry.id, "1042");
        assert_eq!(entry.shipment_code, None);
        assert_eq!(entry.status, 2);
        assert_eq!(entry.box_qty, 3);
        assert_eq!(entry.pcs_qty, 40);
        assert_eq!(entry.product_category, Some(ProductCategory::Clothes));
        assert!(entry.has_brand);
        assert!(!entry.is_found_for_shipment);
        assert_eq!(entry.record_id, 17);
        assert!(entry.date_of_entry.is_some());
    }

    #[test]
    fn unknown_category_is_dropped() {
        let backend = BackendEntry {
            product_category: Some("furniture".into()),
            ..Default::default()
        };
        assert_eq!(backend.to_domain().product_category, None);
    }

    #[test]
    fn field_values_encode_flags_as_integers() {
        let entry = Entry {
            customer_code: "CON".into(),
            box_qty: 1,
            has_brand: true,
            product_category: Some(ProductCategory::HouseholdGoods),
            ..Default::default()
        };
        let audit = entry.field_values().audit_data();
        assert!(audit.contains("[has_brand:1]"));
        assert!(audit.contains("[is_found_for_shipment:0]"));
        assert!(audit.contains("[product_category:household_goods]"));
        assert!(audit.starts_with("[CustomerCode:CON]"));
    }

    #[test]
    fn record_id_is_not_serialized() {
        let entry = Entry {
            id: "1".into(),
            customer_code: "CON".into(),
            record_id: 99,
            ..Default::default()
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("record_id").is_none());
        assert_eq!(json["source_of_entry"], json!(""));
    }
}
