//! Per-transport commission.

use domain::{Money, Route, Segment, TransportType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Commission rates as decimal fractions (`0.07` == 7%).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionRates {
    pub air: Decimal,
    pub rail: Decimal,
    pub bus: Decimal,
    pub river: Decimal,
    pub taxi: Decimal,
    pub walk: Decimal,
    /// Applied to any transport type without its own rate.
    pub default: Decimal,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            air: Decimal::new(7, 2),
            rail: Decimal::new(5, 2),
            bus: Decimal::new(8, 2),
            river: Decimal::new(10, 2),
            taxi: Decimal::new(15, 2),
            walk: Decimal::ZERO,
            default: Decimal::new(7, 2),
        }
    }
}

impl CommissionRates {
    /// Returns the rate for a transport type, falling back to `default`.
    pub fn rate_for(&self, transport_type: &TransportType) -> Decimal {
        match transport_type {
            TransportType::Air => self.air,
            TransportType::Rail => self.rail,
            TransportType::Bus => self.bus,
            TransportType::River => self.river,
            TransportType::Taxi => self.taxi,
            TransportType::Walk => self.walk,
            TransportType::Other(_) => self.default,
        }
    }
}

/// Price of a single segment with its markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentPricing {
    pub base_price: Money,
    pub commission: Money,
    pub total_price: Money,
}

/// Price of a whole route, before insurance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePricing {
    pub base_price: Money,
    pub total_commission: Money,
    pub grand_total: Money,
    /// Per-segment pricing in route order.
    pub segments: Vec<SegmentPricing>,
}

/// Marks up base prices by a fixed per-transport rate table.
#[derive(Debug, Clone, Default)]
pub struct CommissionCalculator {
    rates: CommissionRates,
}

impl CommissionCalculator {
    /// Creates a calculator over the given rate table.
    pub fn new(rates: CommissionRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &CommissionRates {
        &self.rates
    }

    /// Rate applied to a transport type, as a fraction.
    pub fn rate(&self, transport_type: &TransportType) -> Decimal {
        self.rates.rate_for(transport_type)
    }

    /// Rate applied to a transport type, as a percentage (`7` for 7%).
    pub fn rate_percentage(&self, transport_type: &TransportType) -> Decimal {
        self.rate(transport_type) * Decimal::ONE_HUNDRED
    }

    /// Markup charged on `base_price`.
    pub fn commission(&self, transport_type: &TransportType, base_price: Money) -> Money {
        base_price.apply_rate(self.rate(transport_type))
    }

    /// `base_price` plus its markup.
    pub fn total_price(&self, transport_type: &TransportType, base_price: Money) -> Money {
        base_price + self.commission(transport_type, base_price)
    }

    pub fn segment_pricing(&self, segment: &Segment) -> SegmentPricing {
        let commission = self.commission(&segment.transport_type, segment.price);
        SegmentPricing {
            base_price: segment.price,
            commission,
            total_price: segment.price + commission,
        }
    }

    pub fn route_pricing(&self, route: &Route) -> RoutePricing {
        let segments: Vec<SegmentPricing> = route
            .segments
            .iter()
            .map(|s| self.segment_pricing(s))
            .collect();

        let base_price = segments.iter().map(|p| p.base_price).sum();
        let total_commission = segments.iter().map(|p| p.commission).sum();

        RoutePricing {
            base_price,
            total_commission,
            grand_total: base_price + total_commission,
            segments,
        }
    }
}
