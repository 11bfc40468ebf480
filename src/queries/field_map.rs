use std::collections::HashSet;
use tracing::warn;

use super::{FilterField, RequestMeta, SortField};

/// Public field name to backend field name table for one resource.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    resource: &'static str,
    fields: &'static [(&'static str, &'static str)],
}

pub const ENTRY_FIELDS: FieldMap = FieldMap::new(
    "entry",
    &[
        ("id", "id"),
        ("customer_code", "CustomerCode"),
        ("shipment_code", "Id_shipmentNumber"),
        ("status", "StatusOfEntry_key"),
        ("date_of_entry", "Date_Created_Timestamp"),
        ("source_of_entry", "SourceOfEntry"),
        ("track_code", "TrackCode"),
        ("box_qty", "QuantityOfBoxes"),
        ("pcs_qty", "PieceQuantity"),
        ("product_name", "ProductName"),
        ("warehouse", "Warehouse"),
    ],
);

pub const SHIPMENT_FIELDS: FieldMap = FieldMap::new(
    "shipment",
    &[
        ("id", "Id_shipment"),
        ("code", "code"),
        ("type", "CargoType_number"),
        ("customer_code", "CustomerCode"),
        ("packages_qty", "PackageQuantity"),
        ("pieces_qty", "TotalQuanity"),
        ("current_status", "ShipmentStatus_number"),
        ("transport_method", "TransportationMethod_number"),
        ("package_method", "package_method"),
        ("departure_warehouse", "Departure_Warehouse"),
        ("arrival_warehouse", "Arrival_Warehouse"),
        ("date_created", "Date_Created"),
        ("date_modified", "Date_Modified_Timestamp"),
    ],
);

pub const CUSTOMER_FIELDS: FieldMap =
    FieldMap::new("customer", &[("id", "Id_customer"), ("code", "CustomerCode")]);

impl FieldMap {
    pub const fn new(
        resource: &'static str,
        fields: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { resource, fields }
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }

    pub fn internal(&self, public: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == public)
            .map(|(_, internal)| *internal)
    }

    /// Rewrites sort and filter names to backend names.
    ///
    /// Unknown names are dropped, not rejected. Every drop is logged and counted
    /// under `query.fields_dropped`. Filters stay unique by backend name; the
    /// last occurrence wins.
    pub fn translate(&self, meta: RequestMeta) -> RequestMeta {
        let mut translated = meta;

        let sort = std::mem::take(&mut translated.sort);
        translated.sort = sort
            .into_iter()
            .filter_map(|field| match self.internal(field.name.trim()) {
                Some(internal) => Some(SortField {
                    name: internal.to_string(),
                    descending: field.descending,
                }),
                None => {
                    self.record_drop("sort", &field.name);
                    None
                }
            })
            .collect();

        let filters = std::mem::take(&mut translated.filters);
        let mut seen = HashSet::new();
        let mut unique: Vec<FilterField> = Vec::with_capacity(filters.len());
        for field in filters.into_iter().rev() {
            match self.internal(field.key.trim()) {
                Some(internal) => {
                    if seen.insert(internal) {
                        unique.push(FilterField::new(internal, field.value));
                    }
                }
                None => self.record_drop("filter", &field.key),
            }
        }
        unique.reverse();
        translated.filters = unique;

        translated
    }

    fn record_drop(&self, kind: &'static str, name: &str) {
        warn!(
            resource = self.resource,
            kind,
            field = name,
            "dropping unknown query field"
        );
        metrics::counter!("query.fields_dropped", 1, "resource" => self.resource, "kind" => kind);
    }
}
