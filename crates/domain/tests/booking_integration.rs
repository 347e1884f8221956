//! Integration tests for the Booking aggregate.
//!
//! These tests drive a booking through its lifecycle using routes built the
//! way route search produces them, and check the totals invariant over
//! arbitrary segment prices.

use chrono::{DateTime, NaiveDate, Utc};
use common::{RouteId, SegmentId};
use domain::{
    BookedSegment, Booking, BookingStatus, DomainError, Money, Passenger, Payment, PaymentMethod,
    PaymentStatus, Route, Segment, Stop, TransportType,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn passenger() -> Passenger {
    Passenger {
        first_name: "Pyotr".to_string(),
        last_name: "Ivanov".to_string(),
        middle_name: Some("Sergeevich".to_string()),
        birth_date: NaiveDate::from_ymd_opt(1979, 11, 30).unwrap(),
        passport_number: "9812 445566".to_string(),
        email: "pyotr@example.com".to_string(),
        phone: "+79140000000".to_string(),
    }
}

fn segment(id: &str, transport: TransportType, price: Money) -> Segment {
    Segment {
        id: SegmentId::new(id),
        transport_type: transport,
        provider: "carrier".to_string(),
        from: Stop::new("x", "X", "Moscow"),
        to: Stop::new("y", "Y", "Yakutsk"),
        departure: DateTime::parse_from_rfc3339("2025-08-10T08:00:00+03:00").unwrap(),
        arrival: DateTime::parse_from_rfc3339("2025-08-10T19:00:00+09:00").unwrap(),
        price,
        seat_count: 10,
        reliability: 0.9,
    }
}

mod booking_lifecycle {
    use super::*;

    #[test]
    fn confirm_then_cancel_then_refund() {
        let route = Route::new(
            "moscow-yakutsk",
            vec![
                segment("SU-1", TransportType::Air, Money::from_major(20000)),
                segment("BUS-7", TransportType::Bus, Money::from_major(900)),
            ],
        );

        let mut booking = Booking::new(route.id.clone(), passenger());
        for (i, s) in route.segments.iter().enumerate() {
            let booked = BookedSegment::new(
                s,
                format!("TKT-{i}"),
                format!("REF-{i}"),
                Money::from_major(100),
            );
            booking.add_segment(booked).unwrap();
        }
        assert_eq!(booking.total_price(), route.total_price());

        let mut payment = Payment::new(
            booking.id(),
            booking.grand_total(),
            "RUB",
            PaymentMethod::YooKassa,
        );
        payment.set_provider_payment_id("yk-1");
        payment.mark_completed(Utc::now()).unwrap();
        booking.attach_payment(payment).unwrap();

        booking.mark_confirmed().unwrap();
        assert_eq!(booking.status(), BookingStatus::Confirmed);

        booking.mark_cancelled("passenger request").unwrap();
        booking
            .payment_mut()
            .unwrap()
            .mark_refunded(Utc::now())
            .unwrap();
        booking.mark_refunded().unwrap();

        assert_eq!(booking.status(), BookingStatus::Refunded);
        assert_eq!(
            booking.payment().map(Payment::status),
            Some(PaymentStatus::Refunded)
        );
    }

    #[test]
    fn refunded_booking_cannot_be_confirmed() {
        let mut booking = Booking::new(RouteId::new("r"), passenger());
        booking.mark_failed("no seats").unwrap();
        booking.mark_refunded().unwrap();
        assert!(matches!(
            booking.mark_confirmed(),
            Err(DomainError::ConfirmationPrecondition(_))
                | Err(DomainError::InvalidBookingTransition { .. })
        ));
    }
}

proptest! {
    #[test]
    fn grand_total_is_price_plus_commission_plus_premium(
        prices in prop::collection::vec(1i64..10_000_000, 1..8),
        rate_bp in 0i64..2_000,
        premium_minor in 0i64..1_000_000,
        insured in any::<bool>(),
    ) {
        let rate = Decimal::new(rate_bp, 4);
        let premium = Money::from_minor(premium_minor);
        let mut booking = Booking::new(RouteId::new("prop"), passenger());
        if insured {
            booking.include_insurance_premium(premium, None).unwrap();
        }

        for (i, minor) in prices.iter().enumerate() {
            let s = segment(&format!("S{i}"), TransportType::Rail, Money::from_minor(*minor));
            let commission = s.price.apply_rate(rate);
            booking
                .add_segment(BookedSegment::new(&s, "T", "R", commission))
                .unwrap();

            let expected_premium = if insured { premium } else { Money::ZERO };
            prop_assert_eq!(
                booking.grand_total(),
                booking.total_price() + booking.total_commission() + expected_premium
            );
        }

        for s in booking.segments() {
            prop_assert_eq!(s.total_price(), s.price() + s.commission());
        }
    }
}
