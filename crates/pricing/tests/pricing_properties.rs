//! Property tests for commission and insurance pricing.

use chrono::{DateTime, FixedOffset, TimeDelta};
use common::SegmentId;
use domain::{Money, Route, Segment, Stop, TransportType};
use pricing::{
    CommissionCalculator, CommissionRates, InsuranceCalculator, SurchargeKind,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn transport_type() -> impl Strategy<Value = TransportType> {
    prop_oneof![
        Just(TransportType::Air),
        Just(TransportType::Rail),
        Just(TransportType::Bus),
        Just(TransportType::River),
        Just(TransportType::Taxi),
        Just(TransportType::Walk),
        "[a-z]{3,10}".prop_map(TransportType::from),
    ]
}

fn rate() -> impl Strategy<Value = Decimal> {
    (0i64..10_000).prop_map(|bp| Decimal::new(bp, 4))
}

fn rates() -> impl Strategy<Value = CommissionRates> {
    (rate(), rate(), rate(), rate(), rate(), rate(), rate()).prop_map(
        |(air, rail, bus, river, taxi, walk, default)| CommissionRates {
            air,
            rail,
            bus,
            river,
            taxi,
            walk,
            default,
        },
    )
}

fn route(transports: Vec<TransportType>, gap_minutes: i64) -> Route {
    let start = DateTime::parse_from_rfc3339("2025-09-01T10:00:00+03:00").unwrap();
    let mut departure: DateTime<FixedOffset> = start;
    let segments = transports
        .into_iter()
        .enumerate()
        .map(|(i, t)| {
            let arrival = departure + TimeDelta::hours(1);
            let s = Segment {
                id: SegmentId::new(format!("S{i}")),
                transport_type: t,
                provider: "op".to_string(),
                from: Stop::new("a", "A", "A"),
                to: Stop::new("b", "B", "B"),
                departure,
                arrival,
                price: Money::from_major(1000),
                seat_count: 10,
                reliability: 0.5,
            };
            departure = arrival + TimeDelta::minutes(gap_minutes);
            s
        })
        .collect();
    Route::new("prop", segments)
}

proptest! {
    #[test]
    fn total_is_base_plus_commission(
        rates in rates(),
        transport in transport_type(),
        minor in 0i64..1_000_000_000,
    ) {
        let calc = CommissionCalculator::new(rates.clone());
        let base = Money::from_minor(minor);
        let commission = calc.commission(&transport, base);

        prop_assert_eq!(calc.total_price(&transport, base), base + commission);
        prop_assert_eq!(commission.amount(), base.amount() * rates.rate_for(&transport));
    }

    #[test]
    fn multi_segment_surcharge_applies_once(count in 3usize..12) {
        // Long layovers, daytime rail only: the multi-segment rule is the only one that fires.
        let route = route(vec![TransportType::Rail; count], 240);
        let quote = InsuranceCalculator::default().quote(&route);

        let multi = quote
            .surcharges
            .iter()
            .filter(|s| s.kind == SurchargeKind::MultiSegment)
            .count();
        prop_assert_eq!(multi, 1);
        prop_assert_eq!(quote.surcharge_rate, Decimal::new(1, 2));
    }

    #[test]
    fn short_routes_have_no_multi_segment_surcharge(count in 1usize..3) {
        let route = route(vec![TransportType::Bus; count], 240);
        let quote = InsuranceCalculator::default().quote(&route);
        prop_assert!(!quote.has(SurchargeKind::MultiSegment));
    }

    #[test]
    fn route_pricing_matches_segment_sum(
        transports in prop::collection::vec(transport_type(), 0..8),
    ) {
        let calc = CommissionCalculator::default();
        let route = route(transports, 30);
        let pricing = calc.route_pricing(&route);

        prop_assert_eq!(pricing.base_price, route.total_price());
        prop_assert_eq!(pricing.grand_total, pricing.base_price + pricing.total_commission);
        let sum: Money = pricing.segments.iter().map(|p| p.total_price).sum();
        prop_assert_eq!(pricing.grand_total, sum);
    }
}
