//! Data access for the backend record store and the local printed-label ledger.

pub mod customer_repository;
pub mod entry_repository;
pub mod printed_label_repository;
pub mod shipment_repository;

pub use customer_repository::CustomerRepository;
pub use entry_repository::EntryRepository;
pub use printed_label_repository::PrintedLabelRepository;
pub use shipment_repository::ShipmentRepository;

/// Characters the backend reads as find operators.
const FIND_OPERATORS: &[char] = &[
    '\\', '=', '!', '<', '>', '≤', '≥', '.', '/', '?', '@', '#', '*', '"', '~',
];

/// Find value matching `value` exactly. Operators inside `value` are escaped
/// so caller-supplied ids never widen the match.
pub(crate) fn exact(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push_str("==");
    for c in value.chars() {
        if FIND_OPERATORS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_keeps_plain_values() {
        assert_eq!(exact("SPN00123"), "==SPN00123");
        assert_eq!(exact("GZWH2"), "==GZWH2");
    }

    #[test]
    fn exact_escapes_find_operators() {
        assert_eq!(exact("*"), r"==\*");
        assert_eq!(exact("E1@"), r"==E1\@");
        assert_eq!(exact("1...9"), r"==1\.\.\.9");
        assert_eq!(exact(r"a\b"), r"==a\\b");
        assert_eq!(exact("=x"), r"==\=x");
    }
}
