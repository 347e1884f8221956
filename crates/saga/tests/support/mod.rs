//! Shared fixtures for saga integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use common::{RouteId, SegmentId};
use domain::{Money, Passenger, PaymentMethod, Route, Segment, Stop, TransportType};
use saga::{
    BookingRequest, BookingSaga, InMemoryPaymentGateway, InMemoryProviderGateway,
    PaymentProcessor, ProviderRegistry, ReconciliationHandler,
};
use store::{InMemoryBookingRepository, InMemoryRouteRepository};

pub const ROUTE_ID: &str = "moscow-lena-pillars";

pub type TestSaga =
    BookingSaga<InMemoryBookingRepository, InMemoryRouteRepository, InMemoryPaymentGateway>;

pub struct TestHarness {
    pub saga: TestSaga,
    pub reconciliation: ReconciliationHandler<InMemoryBookingRepository>,
    pub bookings: InMemoryBookingRepository,
    pub routes: InMemoryRouteRepository,
    pub air: InMemoryProviderGateway,
    pub rail: InMemoryProviderGateway,
    pub river: InMemoryProviderGateway,
    pub gateway: InMemoryPaymentGateway,
}

impl TestHarness {
    pub async fn new() -> Self {
        let air = InMemoryProviderGateway::new("AIR");
        let rail = InMemoryProviderGateway::new("RZD");
        let river = InMemoryProviderGateway::new("LTF");
        let registry = ProviderRegistry::new()
            .with("aeroflot", Arc::new(air.clone()))
            .with("rzd", Arc::new(rail.clone()))
            .with("lenaturflot", Arc::new(river.clone()));
        Self::with_registry(registry, air, rail, river).await
    }

    pub async fn with_registry(
        registry: ProviderRegistry,
        air: InMemoryProviderGateway,
        rail: InMemoryProviderGateway,
        river: InMemoryProviderGateway,
    ) -> Self {
        let bookings = InMemoryBookingRepository::new();
        let routes = InMemoryRouteRepository::with_routes([
            three_segment_route(),
            Route::new("empty", vec![]),
        ])
        .await;
        let gateway = InMemoryPaymentGateway::new();

        let saga = BookingSaga::new(
            bookings.clone(),
            routes.clone(),
            registry.clone(),
            PaymentProcessor::new(gateway.clone(), "RUB"),
        );
        let reconciliation = ReconciliationHandler::new(bookings.clone(), registry);

        Self {
            saga,
            reconciliation,
            bookings,
            routes,
            air,
            rail,
            river,
            gateway,
        }
    }

    /// Total provider cancel calls across all operators.
    pub fn total_cancel_calls(&self) -> usize {
        self.air.cancel_calls().len() + self.rail.cancel_calls().len() + self.river.cancel_calls().len()
    }
}

pub fn passenger() -> Passenger {
    Passenger {
        first_name: "Maria".to_string(),
        last_name: "Vasilyeva".to_string(),
        middle_name: Some("Ivanovna".to_string()),
        birth_date: NaiveDate::from_ymd_opt(1988, 4, 12).unwrap(),
        passport_number: "4509 112233".to_string(),
        email: "maria@example.com".to_string(),
        phone: "+79161234567".to_string(),
    }
}

pub fn request(include_insurance: bool) -> BookingRequest {
    BookingRequest {
        route_id: RouteId::new(ROUTE_ID),
        passenger: passenger(),
        include_insurance,
        payment_method: PaymentMethod::YooKassa,
    }
}

pub fn segment(
    id: &str,
    transport_type: TransportType,
    provider: &str,
    from: Stop,
    to: Stop,
    departure: &str,
    arrival: &str,
    price: i64,
) -> Segment {
    Segment {
        id: SegmentId::new(id),
        transport_type,
        provider: provider.to_string(),
        from,
        to,
        departure: DateTime::parse_from_rfc3339(departure).unwrap(),
        arrival: DateTime::parse_from_rfc3339(arrival).unwrap(),
        price: Money::from_major(price),
        seat_count: 100,
        reliability: 0.9,
    }
}

/// Moscow -> Yakutsk by air, Yakutsk -> Nizhny Bestyakh by rail,
/// Nizhny Bestyakh -> Lena Pillars by river.
///
/// Base 32500, commission 2400, insurance premium 2600.
pub fn three_segment_route() -> Route {
    let svo = Stop::new("SVO", "Sheremetyevo", "Moscow");
    let yks = Stop::new("YKS", "Yakutsk airport", "Yakutsk");
    let nbs = Stop::new("NBS", "Nizhny Bestyakh station", "Nizhny Bestyakh");
    let lps = Stop::new("LPS", "Lena Pillars pier", "Lena Pillars");

    Route::new(
        ROUTE_ID,
        vec![
            segment(
                "S1",
                TransportType::Air,
                "aeroflot",
                svo,
                yks.clone(),
                "2025-07-01T08:00:00+03:00",
                "2025-07-01T17:30:00+09:00",
                20_000,
            ),
            segment(
                "S2",
                TransportType::Rail,
                "rzd",
                yks,
                nbs.clone(),
                "2025-07-02T09:00:00+09:00",
                "2025-07-02T15:00:00+09:00",
                5_000,
            ),
            segment(
                "S3",
                TransportType::River,
                "lenaturflot",
                nbs,
                lps,
                "2025-07-03T10:00:00+09:00",
                "2025-07-03T20:00:00+09:00",
                7_500,
            ),
        ],
    )
}
