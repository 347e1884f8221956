//! Trip insurance premium.
//!
//! The premium is a base rate on the route's total base price plus additive
//! risk surcharges. Each surcharge is itemized in a [`PremiumBreakdown`] so a
//! caller can show why a route costs what it does.

use chrono::{TimeDelta, Timelike};
use domain::{CoverageLevel, InsuranceCoverage, Money, Route, TransportType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Premium rates as decimal fractions of the route price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsuranceRates {
    pub base_rate: Decimal,
    /// Added once per connection shorter than `tight_connection_minutes`.
    pub tight_connection_surcharge: Decimal,
    pub tight_connection_minutes: i64,
    /// Added once if any air segment departs in the local night window.
    pub night_air_surcharge: Decimal,
    /// Added once if any segment travels by river.
    pub river_surcharge: Decimal,
    /// Added once if the route has at least `multi_segment_threshold` segments.
    pub multi_segment_surcharge: Decimal,
    pub multi_segment_threshold: usize,
}

impl Default for InsuranceRates {
    fn default() -> Self {
        Self {
            base_rate: Decimal::new(5, 2),
            tight_connection_surcharge: Decimal::new(1, 2),
            tight_connection_minutes: 120,
            night_air_surcharge: Decimal::new(5, 3),
            river_surcharge: Decimal::new(2, 2),
            multi_segment_surcharge: Decimal::new(1, 2),
            multi_segment_threshold: 3,
        }
    }
}

/// Why a surcharge was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurchargeKind {
    /// Connection after segment `after_segment` is shorter than the threshold.
    TightConnection { after_segment: usize },
    NightAir,
    River,
    MultiSegment,
}

/// One itemized surcharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Surcharge {
    #[serde(flatten)]
    pub kind: SurchargeKind,
    pub rate: Decimal,
    pub amount: Money,
}

/// Itemized insurance premium for a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PremiumBreakdown {
    /// Route total base price the rates apply to.
    pub base_price: Money,
    pub base_rate: Decimal,
    pub base_premium: Money,
    pub surcharges: Vec<Surcharge>,
    /// Sum of all surcharge rates.
    pub surcharge_rate: Decimal,
    /// `base_premium` plus every surcharge amount.
    pub premium: Money,
    pub coverage: InsuranceCoverage,
}

impl PremiumBreakdown {
    fn empty() -> Self {
        Self {
            base_price: Money::ZERO,
            base_rate: Decimal::ZERO,
            base_premium: Money::ZERO,
            surcharges: Vec::new(),
            surcharge_rate: Decimal::ZERO,
            premium: Money::ZERO,
            coverage: InsuranceCoverage {
                level: CoverageLevel::Basic,
                amount: Money::ZERO,
            },
        }
    }

    /// Returns true if a surcharge of the given kind was applied.
    pub fn has(&self, kind: SurchargeKind) -> bool {
        self.surcharges.iter().any(|s| s.kind == kind)
    }
}

/// Prices trip insurance from route risk heuristics.
#[derive(Debug, Clone, Default)]
pub struct InsuranceCalculator {
    rates: InsuranceRates,
}

impl InsuranceCalculator {
    pub fn new(rates: InsuranceRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &InsuranceRates {
        &self.rates
    }

    /// Premium for the route. Zero for a route with no segments.
    pub fn premium(&self, route: &Route) -> Money {
        self.quote(route).premium
    }

    /// Premium for the route with every surcharge itemized.
    pub fn quote(&self, route: &Route) -> PremiumBreakdown {
        if route.is_empty() {
            return PremiumBreakdown::empty();
        }

        let base_price = route.total_price();
        let rates = &self.rates;
        let mut kinds = Vec::new();

        let threshold = TimeDelta::minutes(rates.tight_connection_minutes);
        for (i, gap) in route.connection_gaps().into_iter().enumerate() {
            if gap < threshold {
                kinds.push((
                    SurchargeKind::TightConnection { after_segment: i },
                    rates.tight_connection_surcharge,
                ));
            }
        }

        if route.segments.iter().any(|s| {
            s.transport_type == TransportType::Air && is_night_hour(s.departure.hour())
        }) {
            kinds.push((SurchargeKind::NightAir, rates.night_air_surcharge));
        }

        if route.uses(&TransportType::River) {
            kinds.push((SurchargeKind::River, rates.river_surcharge));
        }

        if route.segment_count() >= rates.multi_segment_threshold {
            kinds.push((SurchargeKind::MultiSegment, rates.multi_segment_surcharge));
        }

        let surcharges: Vec<Surcharge> = kinds
            .into_iter()
            .map(|(kind, rate)| Surcharge {
                kind,
                rate,
                amount: base_price.apply_rate(rate),
            })
            .collect();

        let surcharge_rate: Decimal = surcharges.iter().map(|s| s.rate).sum();
        let base_premium = base_price.apply_rate(rates.base_rate);
        let premium = base_premium + surcharges.iter().map(|s| s.amount).sum();

        PremiumBreakdown {
            base_price,
            base_rate: rates.base_rate,
            base_premium,
            surcharges,
            surcharge_rate,
            premium,
            coverage: coverage_for(base_price, surcharge_rate),
        }
    }
}

/// Departure hour in [22:00, 06:00).
fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour < 6
}

fn coverage_for(base_price: Money, surcharge_rate: Decimal) -> InsuranceCoverage {
    if surcharge_rate >= Decimal::new(5, 2) {
        InsuranceCoverage {
            level: CoverageLevel::Premium,
            amount: base_price.apply_rate(Decimal::new(15, 1)),
        }
    } else if surcharge_rate >= Decimal::new(3, 2) {
        InsuranceCoverage {
            level: CoverageLevel::Standard,
            amount: base_price.apply_rate(Decimal::new(12, 1)),
        }
    } else {
        InsuranceCoverage {
            level: CoverageLevel::Basic,
            amount: base_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use common::SegmentId;
    use domain::{Segment, Stop};
    use rust_decimal_macros::dec;

    fn segment(transport: TransportType, departure: &str, arrival: &str, price: i64) -> Segment {
        Segment {
            id: SegmentId::new(format!("{transport}-{departure}")),
            transport_type: transport,
            provider: "op".to_string(),
            from: Stop::new("a", "A", "A"),
            to: Stop::new("b", "B", "B"),
            departure: DateTime::parse_from_rfc3339(departure).unwrap(),
            arrival: DateTime::parse_from_rfc3339(arrival).unwrap(),
            price: Money::from_major(price),
            seat_count: 50,
            reliability: 0.9,
        }
    }

    #[test]
    fn test_empty_route_has_zero_premium() {
        let calc = InsuranceCalculator::default();
        let route = Route::new("empty", vec![]);
        assert_eq!(calc.premium(&route), Money::ZERO);
        assert!(calc.quote(&route).surcharges.is_empty());
    }

    #[test]
    fn test_base_premium_only() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![segment(
                TransportType::Rail,
                "2025-06-01T10:00:00+03:00",
                "2025-06-01T18:00:00+03:00",
                10_000,
            )],
        );
        let quote = calc.quote(&route);
        assert_eq!(quote.premium, Money::from_major(500));
        assert!(quote.surcharges.is_empty());
        assert_eq!(quote.coverage.level, CoverageLevel::Basic);
        assert_eq!(quote.coverage.amount, Money::from_major(10_000));
    }

    #[test]
    fn test_tight_connection_is_per_connection() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![
                segment(
                    TransportType::Bus,
                    "2025-06-01T08:00:00+03:00",
                    "2025-06-01T09:00:00+03:00",
                    1000,
                ),
                segment(
                    TransportType::Bus,
                    "2025-06-01T10:00:00+03:00",
                    "2025-06-01T11:00:00+03:00",
                    1000,
                ),
            ],
        );
        let quote = calc.quote(&route);
        assert!(quote.has(SurchargeKind::TightConnection { after_segment: 0 }));
        assert_eq!(quote.surcharge_rate, dec!(0.01));
        // 2000 * (0.05 + 0.01)
        assert_eq!(quote.premium, Money::from_major(120));
    }

    #[test]
    fn test_connection_of_exactly_two_hours_is_not_tight() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![
                segment(
                    TransportType::Rail,
                    "2025-06-01T08:00:00+03:00",
                    "2025-06-01T09:00:00+03:00",
                    1000,
                ),
                segment(
                    TransportType::Rail,
                    "2025-06-01T11:00:00+03:00",
                    "2025-06-01T12:00:00+03:00",
                    1000,
                ),
            ],
        );
        assert!(calc.quote(&route).surcharges.is_empty());
    }

    #[test]
    fn test_night_air_uses_local_departure_hour() {
        let calc = InsuranceCalculator::default();
        // 23:30 local in Yakutsk, 14:30 UTC
        let night = Route::new(
            "r",
            vec![segment(
                TransportType::Air,
                "2025-06-01T23:30:00+09:00",
                "2025-06-02T04:00:00+09:00",
                20_000,
            )],
        );
        let quote = calc.quote(&night);
        assert!(quote.has(SurchargeKind::NightAir));
        assert_eq!(quote.premium, Money::from_major(1100));

        // 05:59 is still night, 06:00 is not
        let early = Route::new(
            "r",
            vec![segment(
                TransportType::Air,
                "2025-06-01T06:00:00+09:00",
                "2025-06-01T09:00:00+09:00",
                20_000,
            )],
        );
        assert!(!calc.quote(&early).has(SurchargeKind::NightAir));
    }

    #[test]
    fn test_night_rail_has_no_night_surcharge() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![segment(
                TransportType::Rail,
                "2025-06-01T23:30:00+03:00",
                "2025-06-02T08:00:00+03:00",
                5000,
            )],
        );
        assert!(!calc.quote(&route).has(SurchargeKind::NightAir));
    }

    #[test]
    fn test_river_and_multi_segment() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![
                segment(
                    TransportType::Bus,
                    "2025-06-01T06:00:00+09:00",
                    "2025-06-01T08:00:00+09:00",
                    1000,
                ),
                segment(
                    TransportType::River,
                    "2025-06-01T12:00:00+09:00",
                    "2025-06-01T20:00:00+09:00",
                    6000,
                ),
                segment(
                    TransportType::Bus,
                    "2025-06-02T09:00:00+09:00",
                    "2025-06-02T10:00:00+09:00",
                    3000,
                ),
            ],
        );
        let quote = calc.quote(&route);
        assert!(quote.has(SurchargeKind::River));
        assert!(quote.has(SurchargeKind::MultiSegment));
        assert_eq!(quote.surcharge_rate, dec!(0.03));
        // 10000 * (0.05 + 0.02 + 0.01)
        assert_eq!(quote.premium, Money::from_major(800));
        assert_eq!(quote.coverage.level, CoverageLevel::Standard);
        assert_eq!(quote.coverage.amount, Money::from_major(12_000));
    }

    #[test]
    fn test_premium_coverage_level() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![
                segment(
                    TransportType::Air,
                    "2025-06-01T01:00:00+03:00",
                    "2025-06-01T03:00:00+03:00",
                    1000,
                ),
                segment(
                    TransportType::River,
                    "2025-06-01T04:00:00+03:00",
                    "2025-06-01T05:00:00+03:00",
                    1000,
                ),
                segment(
                    TransportType::Bus,
                    "2025-06-01T05:30:00+03:00",
                    "2025-06-01T07:00:00+03:00",
                    1000,
                ),
            ],
        );
        let quote = calc.quote(&route);
        // two tight connections, night air, river, multi-segment
        assert_eq!(quote.surcharge_rate, dec!(0.055));
        assert_eq!(quote.coverage.level, CoverageLevel::Premium);
        assert_eq!(quote.coverage.amount, Money::from_major(4500));
    }

    #[test]
    fn test_breakdown_sums_to_premium() {
        let calc = InsuranceCalculator::default();
        let route = Route::new(
            "r",
            vec![
                segment(
                    TransportType::Air,
                    "2025-06-01T22:15:00+03:00",
                    "2025-06-02T01:00:00+03:00",
                    7777,
                ),
                segment(
                    TransportType::Taxi,
                    "2025-06-02T01:30:00+03:00",
                    "2025-06-02T02:00:00+03:00",
                    333,
                ),
            ],
        );
        let quote = calc.quote(&route);
        let itemized: Money = quote.surcharges.iter().map(|s| s.amount).sum();
        assert_eq!(quote.premium, quote.base_premium + itemized);
    }
}
