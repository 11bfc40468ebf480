pub mod customer;
pub mod entry;
pub mod note;
pub mod partner_info;
pub mod shipment;
pub mod unit_load;

pub use customer::Customer;
pub use entry::Entry;
pub use note::Note;
pub use partner_info::{DeliveryMethod, PartnerInfo, Recipient};
pub use shipment::{Shipment, ShipmentError, ShipmentStatus, ShipmentType, TransferPoints, TransportMethod};
pub use unit_load::UnitLoad;
