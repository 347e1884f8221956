//! Pricing for journey bookings.
//!
//! Both calculators are pure and synchronous. Their output is fixed on the
//! booking before any operator is contacted:
//! - [`CommissionCalculator`] marks up each segment by a per-transport rate
//! - [`InsuranceCalculator`] prices optional trip insurance from route risk

pub mod commission;
pub mod insurance;

pub use commission::{CommissionCalculator, CommissionRates, RoutePricing, SegmentPricing};
pub use insurance::{InsuranceCalculator, InsuranceRates, PremiumBreakdown, Surcharge, SurchargeKind};
