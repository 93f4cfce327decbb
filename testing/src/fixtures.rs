//! Seeded hotel for scenario tests.

#![allow(clippy::unwrap_used)] // Fixture dates are hardcoded

use crate::mocks::{ManualClock, RecordingNotifier, test_clock};
use crate::store::InMemoryStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use hotel_core::environment::Clock;
use hotel_core::{
    BookingManager, CreateBooking, CreateReservation, HotelEnvironment, Money, PaymentMethod,
    Reservation, ReservationManager, Role, Room, RoomId, RoomManager, RoomStatus, RoomType,
    RoomTypeId, Session, StayWindow, UserId,
};
use std::sync::Arc;
use uuid::Uuid;

/// Midnight UTC on a day of March 2026.
#[must_use]
pub fn march(day: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2026, 3, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Stay between two days of March 2026.
#[must_use]
pub fn stay(check_in_day: u32, check_out_day: u32) -> StayWindow {
    StayWindow::new(march(check_in_day), march(check_out_day)).unwrap()
}

/// "Deluxe": $100/night with a 10% discount, 2 adults + 1 child.
#[must_use]
pub fn deluxe_type() -> RoomType {
    RoomType {
        id: RoomTypeId::new(),
        name: "Deluxe".to_string(),
        description: "King bed, city view".to_string(),
        base_price: Money::from_cents(10_000),
        max_adults: 2,
        max_children: 1,
        discount_percent: 10,
        amenities: vec!["wifi".to_string(), "minibar".to_string()],
    }
}

/// A clean room of the given type.
#[must_use]
pub fn room(room_type_id: RoomTypeId, number: &str) -> Room {
    Room {
        id: RoomId::new(),
        number: number.to_string(),
        room_type_id,
        floor: number
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| i32::try_from(d).ok())
            .unwrap_or(1),
        status: RoomStatus::Available,
    }
}

/// In-memory hotel with one Deluxe room type, its rooms, a manual clock
/// and a recording notifier, plus managers wired to them.
pub struct TestHotel {
    /// Backing store
    pub store: InMemoryStore,
    /// Clock shared with the managers
    pub clock: Arc<ManualClock>,
    /// Recorder shared with the managers
    pub notifier: Arc<RecordingNotifier>,
    /// Environment the managers run in
    pub env: HotelEnvironment,
    /// The Deluxe type
    pub deluxe: RoomType,
    /// Deluxe rooms, in natural order
    pub rooms: Vec<Room>,
    /// A guest
    pub guest: UserId,
}

impl TestHotel {
    /// Seeds `room_count` Deluxe rooms numbered 101, 102, ...
    pub async fn deluxe(room_count: u32) -> Self {
        let store = InMemoryStore::new();
        let clock = Arc::new(ManualClock::new(test_clock().now()));
        let notifier = Arc::new(RecordingNotifier::new());

        let deluxe = deluxe_type();
        store.insert_room_type(deluxe.clone()).await;
        let mut rooms = Vec::new();
        for n in 0..room_count {
            let room = room(deluxe.id, &format!("{}", 101 + n));
            store.insert_room(room.clone()).await;
            rooms.push(room);
        }

        let env = HotelEnvironment::new(
            Arc::new(store.clone()),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&notifier) as Arc<dyn hotel_core::Notifier>,
        );

        Self {
            store,
            clock,
            notifier,
            env,
            deluxe,
            rooms,
            guest: UserId::new(),
        }
    }

    /// Reservation manager over this hotel.
    #[must_use]
    pub fn reservations(&self) -> ReservationManager {
        ReservationManager::new(self.env.clone())
    }

    /// Booking manager over this hotel.
    #[must_use]
    pub fn bookings(&self) -> BookingManager {
        BookingManager::new(self.env.clone())
    }

    /// Room manager over this hotel.
    #[must_use]
    pub fn rooms(&self) -> RoomManager {
        RoomManager::new(self.env.clone())
    }

    /// Hold request for the default guest, 2 adults, March `from`..`to`.
    #[must_use]
    pub fn request(&self, from: u32, to: u32) -> CreateReservation {
        CreateReservation {
            guest_id: self.guest,
            room_type_id: self.deluxe.id,
            stay: stay(from, to),
            adults: 2,
            children: 0,
        }
    }

    /// Booking request converting `reservation` with its own quoted totals.
    #[must_use]
    pub fn booking_for(reservation: &Reservation, method: PaymentMethod) -> CreateBooking {
        CreateBooking {
            guest_id: reservation.guest_id,
            reservation_id: Some(reservation.id),
            stay: reservation.stay,
            adults: reservation.adults,
            children: reservation.children,
            rooms: vec![reservation.room],
            subtotal: reservation.subtotal,
            tax: reservation.tax,
            total: reservation.total,
            payment_method: method,
        }
    }

    /// Walk-in booking request for one room, priced at the Deluxe rate.
    #[must_use]
    pub fn walk_in(&self, room_id: RoomId, window: StayWindow, method: PaymentMethod) -> CreateBooking {
        let line = hotel_core::pricing::quote_room(&self.deluxe, room_id, &window).unwrap();
        let totals = hotel_core::pricing::Totals::from_lines(&[line]).unwrap();
        CreateBooking {
            guest_id: self.guest,
            reservation_id: None,
            stay: window,
            adults: 1,
            children: 0,
            rooms: vec![line],
            subtotal: totals.subtotal,
            tax: totals.tax,
            total: totals.total,
            payment_method: method,
        }
    }

    /// Registers a bearer session and returns its token.
    pub async fn session(&self, user_id: UserId, role: Role) -> Uuid {
        let token = Uuid::new_v4();
        self.store
            .insert_session(Session {
                token,
                user_id,
                role,
                expires_at: self.clock.now() + Duration::days(1),
            })
            .await;
        token
    }
}
