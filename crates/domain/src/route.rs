//! Priced routes and their transport segments.
//!
//! Routes are produced by route search outside this workspace; the booking
//! saga treats them as read-only input.

use chrono::{DateTime, FixedOffset, TimeDelta};
use common::{RouteId, SegmentId};
use serde::{Deserialize, Serialize};

use crate::booking::Money;

/// Mode of transport for a segment.
///
/// Serialized as a lower-case string. Unrecognized strings are preserved in
/// [`TransportType::Other`] so new operator categories round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportType {
    Air,
    Rail,
    Bus,
    River,
    Taxi,
    Walk,
    Other(String),
}

impl TransportType {
    /// Returns the transport type name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            TransportType::Air => "air",
            TransportType::Rail => "rail",
            TransportType::Bus => "bus",
            TransportType::River => "river",
            TransportType::Taxi => "taxi",
            TransportType::Walk => "walk",
            TransportType::Other(name) => name,
        }
    }
}

impl From<String> for TransportType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "air" => TransportType::Air,
            "rail" => TransportType::Rail,
            "bus" => TransportType::Bus,
            "river" => TransportType::River,
            "taxi" => TransportType::Taxi,
            "walk" => TransportType::Walk,
            _ => TransportType::Other(s),
        }
    }
}

impl From<&str> for TransportType {
    fn from(s: &str) -> Self {
        TransportType::from(s.to_string())
    }
}

impl From<TransportType> for String {
    fn from(t: TransportType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stop at either end of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub city: String,
}

impl Stop {
    /// Creates a new stop.
    pub fn new(id: impl Into<String>, name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            city: city.into(),
        }
    }
}

impl std::fmt::Display for Stop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.city)
    }
}

/// One transport leg offered by a single operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub transport_type: TransportType,
    /// Operator that sells this leg. Selects the provider booking gateway.
    pub provider: String,
    pub from: Stop,
    pub to: Stop,
    /// Departure in the local time of the departure stop.
    pub departure: DateTime<FixedOffset>,
    pub arrival: DateTime<FixedOffset>,
    /// Operator's base price, before commission.
    pub price: Money,
    pub seat_count: u32,
    /// Historical on-time ratio in `[0, 1]`.
    pub reliability: f64,
}

impl Segment {
    /// Returns the scheduled travel time of this leg.
    pub fn duration(&self) -> TimeDelta {
        self.arrival.signed_duration_since(self.departure)
    }
}

/// A complete journey made of segments in travel order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub reliability_score: f64,
}

impl Route {
    /// Creates a route from its segments.
    pub fn new(id: impl Into<RouteId>, segments: Vec<Segment>) -> Self {
        Self {
            id: id.into(),
            segments,
            reliability_score: 0.0,
        }
    }

    /// Returns the number of segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if the route has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of segment base prices, before commission.
    pub fn total_price(&self) -> Money {
        self.segments.iter().map(|s| s.price).sum()
    }

    /// Transfer time between each consecutive pair of segments.
    ///
    /// A route with `n` segments has `n - 1` connections. Overlapping legs
    /// yield a negative gap.
    pub fn connection_gaps(&self) -> Vec<TimeDelta> {
        self.segments
            .windows(2)
            .map(|pair| pair[1].departure.signed_duration_since(pair[0].arrival))
            .collect()
    }

    /// Returns true if any segment uses the given transport type.
    pub fn uses(&self, transport_type: &TransportType) -> bool {
        self.segments
            .iter()
            .any(|s| &s.transport_type == transport_type)
    }

    /// City of the first departure, if any.
    pub fn from_city(&self) -> Option<&str> {
        self.segments.first().map(|s| s.from.city.as_str())
    }

    /// City of the last arrival, if any.
    pub fn to_city(&self) -> Option<&str> {
        self.segments.last().map(|s| s.to.city.as_str())
    }
}
