//! Property-based tests for pagination and the derived physical properties of
//! shipments.

use proptest::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};

use warehouse_bridge::models::{Shipment, ShipmentStatus, UnitLoad};
use warehouse_bridge::queries::RequestMeta;

fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn unit_load_strategy() -> impl Strategy<Value = UnitLoad> {
    (weight_strategy(), 0u32..300, 0u32..300, 0u32..300).prop_map(|(weight, l, h, w)| UnitLoad {
        sequence: 1,
        quantity: 1,
        weight,
        length: l,
        height: h,
        width: w,
        ..Default::default()
    })
}

fn status_strategy() -> impl Strategy<Value = ShipmentStatus> {
    (0i64..8).prop_map(ShipmentStatus::from_key)
}

fn shipment_with(unit_loads: Vec<UnitLoad>) -> Shipment {
    let mut shipment = Shipment::new("SPN-PROP");
    shipment.unit_loads = unit_loads;
    shipment
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn pages_below_one_start_at_the_first_record(page in i64::MIN..1, per_page in 1i64..500) {
        let meta = RequestMeta::new(page, per_page).check();
        prop_assert_eq!(meta.page, 1);
        prop_assert_eq!(meta.skip(), 0);
    }

    #[test]
    fn later_pages_skip_whole_pages(page in 2i64..10_000, per_page in 1i64..500) {
        let meta = RequestMeta::new(page, per_page).check();
        prop_assert_eq!(meta.skip(), (page - 1) * per_page);
        prop_assert_eq!(meta.limit(), Some(per_page));
    }

    #[test]
    fn all_records_has_no_limit(page in 1i64..100) {
        let meta = RequestMeta::new(page, -1).check();
        prop_assert_eq!(meta.limit(), None);
        prop_assert_eq!(meta.skip(), 0);
    }

    #[test]
    fn check_is_idempotent(page in -50i64..50, per_page in -1i64..50) {
        let once = RequestMeta::new(page, per_page).check();
        let twice = once.clone().check();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn weight_ignores_unit_load_order(mut loads in prop::collection::vec(unit_load_strategy(), 0..12)) {
        let expected = loads
            .iter()
            .map(|ul| ul.weight)
            .sum::<Decimal>()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let forward = shipment_with(loads.clone()).weight();
        loads.reverse();
        let reversed = shipment_with(loads).weight();

        prop_assert_eq!(forward, expected);
        prop_assert_eq!(reversed, expected);
    }

    #[test]
    fn flat_unit_loads_have_no_cubage(
        weight in weight_strategy(),
        l in 0u32..300,
        h in 0u32..300,
        which in 0usize..3,
    ) {
        let mut dims = [l, h, 300];
        dims[which] = 0;
        let ul = UnitLoad { weight, length: dims[0], height: dims[1], width: dims[2], ..Default::default() };
        prop_assert_eq!(ul.cubage(), Decimal::ZERO);
    }

    #[test]
    fn density_is_zero_without_cubage_and_rounded_otherwise(
        loads in prop::collection::vec(unit_load_strategy(), 0..6),
    ) {
        let shipment = shipment_with(loads);
        let cubage = shipment.cubage();
        if cubage.is_zero() {
            prop_assert_eq!(shipment.density(), Decimal::ZERO);
        } else {
            let expected = (shipment.weight() / cubage)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            prop_assert_eq!(shipment.density(), expected);
        }
    }

    #[test]
    fn only_the_next_status_is_accepted(from in status_strategy(), to in status_strategy()) {
        let mut shipment = shipment_with(Vec::new());
        shipment.status = from;
        let result = shipment.change_status(to);

        if from != ShipmentStatus::DeliveredToRecipient && to == from.next_valid() {
            prop_assert!(result.is_ok());
            prop_assert_eq!(shipment.status, to);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(shipment.status, from);
        }
    }

    #[test]
    fn unit_loads_are_added_only_in_preparation(status in status_strategy(), ul in unit_load_strategy()) {
        let mut shipment = shipment_with(Vec::new());
        shipment.status = status;
        let result = shipment.add_unit_load(ul);

        prop_assert_eq!(result.is_ok(), status == ShipmentStatus::Preparation);
        prop_assert_eq!(shipment.unit_loads.len(), usize::from(status == ShipmentStatus::Preparation));
    }
}
