//! Background work and outbound integrations.

pub mod label_printing;
pub mod shipment_updates;
pub mod tracking;
