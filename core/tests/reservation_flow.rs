//! Reservation manager scenarios against the in-memory store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use chrono::Duration;
use hotel_core::environment::Clock;
use hotel_core::{
    Actor, HotelEnvironment, HotelError, Money, ReservationFilter, ReservationManager,
    ReservationStatus, Role, RoomStatus, RoomTypeId, StayWindow, UserId,
};
use hotel_testing::fixtures::{march, stay};
use hotel_testing::{FailingNotifier, TestHotel};
use std::sync::Arc;

#[tokio::test]
async fn deluxe_hold_is_priced_and_time_boxed() {
    let hotel = TestHotel::deluxe(1).await;
    let now = hotel.clock.now();

    let reservation = hotel
        .reservations()
        .create(hotel.request(1, 3))
        .await
        .expect("hold should succeed");

    assert_eq!(reservation.room.room_id, hotel.rooms[0].id);
    assert_eq!(reservation.room.price_per_night, Money::from_cents(9_000));
    assert_eq!(reservation.room.nights, 2);
    assert_eq!(reservation.subtotal, Money::from_cents(18_000));
    assert_eq!(reservation.tax, Money::from_cents(2_700));
    assert_eq!(reservation.total, Money::from_cents(20_700));
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.expires_at, now + Duration::minutes(15));
    assert!(reservation.code.starts_with("RES-"));

    assert_eq!(hotel.notifier.count("reservation_created"), 1);
    let snapshot = hotel.store.snapshot().await;
    assert_eq!(snapshot.reservations.len(), 1);
}

#[tokio::test]
async fn overlapping_hold_on_last_room_is_rejected() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();

    manager.create(hotel.request(1, 3)).await.unwrap();
    let err = manager.create(hotel.request(2, 4)).await.unwrap_err();
    assert!(matches!(err, HotelError::NoAvailability(_)), "got {err:?}");
    assert_eq!(hotel.store.snapshot().await.reservations.len(), 1);
}

#[tokio::test]
async fn back_to_back_holds_share_a_room() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();

    let first = manager.create(hotel.request(1, 3)).await.unwrap();
    let second = manager.create(hotel.request(3, 5)).await.unwrap();
    assert_eq!(first.room.room_id, second.room.room_id);
}

#[tokio::test]
async fn overlapping_holds_spread_over_rooms_in_order() {
    let hotel = TestHotel::deluxe(2).await;
    let manager = hotel.reservations();

    let first = manager.create(hotel.request(1, 3)).await.unwrap();
    let second = manager.create(hotel.request(1, 3)).await.unwrap();
    assert_eq!(first.room.room_id, hotel.rooms[0].id);
    assert_eq!(second.room.room_id, hotel.rooms[1].id);
}

#[tokio::test]
async fn maintenance_room_is_never_allocated() {
    let hotel = TestHotel::deluxe(2).await;
    hotel
        .store
        .force_room_status(hotel.rooms[0].id, RoomStatus::Maintenance)
        .await;

    let reservation = hotel
        .reservations()
        .create(hotel.request(10, 12))
        .await
        .unwrap();
    assert_eq!(reservation.room.room_id, hotel.rooms[1].id);

    let available = hotel
        .reservations()
        .available_rooms(hotel.deluxe.id, stay(20, 21))
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
}

#[tokio::test]
async fn same_day_arrival_needs_a_ready_room() {
    let hotel = TestHotel::deluxe(1).await;
    hotel.clock.set(march(5) + Duration::hours(10));
    hotel
        .store
        .force_room_status(hotel.rooms[0].id, RoomStatus::Cleaning)
        .await;

    let err = hotel
        .reservations()
        .create(hotel.request(5, 6))
        .await
        .unwrap_err();
    assert!(matches!(err, HotelError::NoAvailability(_)));

    // Future arrivals only look at the calendar.
    hotel.reservations().create(hotel.request(6, 7)).await.unwrap();

    hotel
        .store
        .force_room_status(hotel.rooms[0].id, RoomStatus::Available)
        .await;
    hotel.reservations().create(hotel.request(5, 6)).await.unwrap();
}

#[tokio::test]
async fn unknown_room_type_is_not_found() {
    let hotel = TestHotel::deluxe(1).await;
    let mut request = hotel.request(1, 3);
    request.room_type_id = RoomTypeId::new();

    let err = hotel.reservations().create(request).await.unwrap_err();
    assert!(matches!(err, HotelError::NotFound { resource: "Room type", .. }));
}

#[tokio::test]
async fn occupancy_over_type_limits_is_rejected() {
    let hotel = TestHotel::deluxe(1).await;
    let mut request = hotel.request(1, 3);
    request.adults = 3;

    let err = hotel.reservations().create(request).await.unwrap_err();
    assert!(matches!(err, HotelError::Validation(_)));
    assert!(hotel.store.snapshot().await.reservations.is_empty());
}

#[tokio::test]
async fn failed_notification_does_not_fail_the_hold() {
    let hotel = TestHotel::deluxe(1).await;
    let env = HotelEnvironment::new(
        Arc::new(hotel.store.clone()),
        Arc::clone(&hotel.clock) as Arc<dyn Clock>,
        Arc::new(FailingNotifier),
    );

    let reservation = ReservationManager::new(env)
        .create(hotel.request(1, 3))
        .await
        .expect("notification failure must be swallowed");
    assert_eq!(reservation.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn owner_cancels_and_room_frees_up() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();
    let owner = Actor {
        user_id: hotel.guest,
        role: Role::Guest,
    };
    let stranger = Actor {
        user_id: UserId::new(),
        role: Role::Guest,
    };

    let reservation = manager.create(hotel.request(1, 3)).await.unwrap();

    let err = manager.cancel(stranger, reservation.id).await.unwrap_err();
    assert!(matches!(err, HotelError::Forbidden(_)));

    let cancelled = manager.cancel(owner, reservation.id).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    assert_eq!(hotel.notifier.count("reservation_cancelled"), 1);

    let err = manager.cancel(owner, reservation.id).await.unwrap_err();
    assert!(matches!(err, HotelError::InvalidTransition { .. }));

    manager.create(hotel.request(1, 3)).await.unwrap();
}

#[tokio::test]
async fn staff_status_override_follows_state_machine() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();
    let reservation = manager.create(hotel.request(1, 3)).await.unwrap();

    let expired = manager
        .set_status(reservation.id, ReservationStatus::Expired)
        .await
        .unwrap();
    assert_eq!(expired.status, ReservationStatus::Expired);

    let err = manager
        .set_status(reservation.id, ReservationStatus::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, HotelError::InvalidTransition { .. }));
}

#[tokio::test]
async fn listings_filter_by_owner_and_status() {
    let hotel = TestHotel::deluxe(3).await;
    let manager = hotel.reservations();
    let other_guest = UserId::new();

    manager.create(hotel.request(1, 2)).await.unwrap();
    let mut theirs = hotel.request(1, 2);
    theirs.guest_id = other_guest;
    let their_hold = manager.create(theirs).await.unwrap();
    manager
        .set_status(their_hold.id, ReservationStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(manager.my_reservations(hotel.guest).await.unwrap().len(), 1);
    assert_eq!(manager.list(ReservationFilter::default()).await.unwrap().len(), 2);
    let cancelled = manager
        .list(ReservationFilter {
            guest_id: None,
            status: Some(ReservationStatus::Cancelled),
        })
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].guest_id, other_guest);
}

#[tokio::test]
async fn get_is_owner_or_staff_only() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();
    let reservation = manager.create(hotel.request(1, 3)).await.unwrap();

    let staff = Actor {
        user_id: UserId::new(),
        role: Role::Receptionist,
    };
    assert_eq!(manager.get(staff, reservation.id).await.unwrap().id, reservation.id);

    let stranger = Actor {
        user_id: UserId::new(),
        role: Role::Guest,
    };
    assert!(matches!(
        manager.get(stranger, reservation.id).await,
        Err(HotelError::Forbidden(_))
    ));
}

#[tokio::test]
async fn inverted_window_never_reaches_the_manager() {
    assert!(matches!(
        StayWindow::new(march(3), march(1)),
        Err(HotelError::Validation(_))
    ));
}

#[tokio::test]
async fn lost_room_lock_is_a_capacity_error() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();

    // Browsing availability reads without locks, so the armed failure
    // is still waiting for the first writer.
    hotel.store.fail_next_lock();
    let free = manager
        .available_rooms(hotel.deluxe.id, stay(1, 3))
        .await
        .unwrap();
    assert_eq!(free.len(), 1);

    let err = manager.create(hotel.request(1, 3)).await.unwrap_err();
    assert!(matches!(err, HotelError::NoAvailability(_)), "got {err:?}");
    assert!(hotel.store.snapshot().await.reservations.is_empty());

    manager.create(hotel.request(1, 3)).await.unwrap();
}

#[tokio::test]
async fn retry_after_lost_lock_takes_next_free_room() {
    let hotel = TestHotel::deluxe(2).await;
    let manager = hotel.reservations();
    manager.create(hotel.request(1, 3)).await.unwrap();

    // Room 101 is turned down on a plain read; the lock on 102 fails.
    hotel.store.fail_next_lock();
    let err = manager.create(hotel.request(2, 4)).await.unwrap_err();
    assert!(matches!(err, HotelError::NoAvailability(_)));

    let second = manager.create(hotel.request(2, 4)).await.unwrap();
    assert_eq!(second.room.room_id, hotel.rooms[1].id);
}
