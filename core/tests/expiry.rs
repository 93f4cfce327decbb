//! Lazy expiry on read and the bulk expiry sweep.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use hotel_core::{Actor, ReservationFilter, ReservationStatus, Role};
use hotel_testing::TestHotel;

#[tokio::test]
async fn lapsed_hold_reads_as_expired_before_the_sweep() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();
    let reservation = manager.create(hotel.request(1, 3)).await.unwrap();

    hotel.clock.advance(Duration::minutes(15));

    let mine = manager.my_reservations(hotel.guest).await.unwrap();
    assert_eq!(mine[0].status, ReservationStatus::Expired);

    let owner = Actor {
        user_id: hotel.guest,
        role: Role::Guest,
    };
    assert_eq!(
        manager.get(owner, reservation.id).await.unwrap().status,
        ReservationStatus::Expired
    );

    let pending = manager
        .list(ReservationFilter {
            guest_id: None,
            status: Some(ReservationStatus::Pending),
        })
        .await
        .unwrap();
    assert!(pending.is_empty());

    // Nothing has been written yet.
    let snapshot = hotel.store.snapshot().await;
    assert_eq!(
        snapshot.reservation(reservation.id).unwrap().status,
        ReservationStatus::Pending
    );
}

#[tokio::test]
async fn sweep_persists_expiry_idempotently() {
    let hotel = TestHotel::deluxe(2).await;
    let manager = hotel.reservations();
    let old = manager.create(hotel.request(1, 3)).await.unwrap();
    hotel.clock.advance(Duration::minutes(10));
    let fresh = manager.create(hotel.request(1, 3)).await.unwrap();
    hotel.clock.advance(Duration::minutes(6));

    assert_eq!(manager.expire_stale().await.unwrap(), 1);
    let after_first = hotel.store.snapshot().await;
    assert_eq!(manager.expire_stale().await.unwrap(), 0);
    let after_second = hotel.store.snapshot().await;

    assert_eq!(
        after_first.reservation(old.id).unwrap().status,
        ReservationStatus::Expired
    );
    assert_eq!(
        after_first.reservation(fresh.id).unwrap().status,
        ReservationStatus::Pending
    );
    assert_eq!(after_first.reservations, after_second.reservations);
}

#[tokio::test]
async fn lapsed_hold_stops_blocking_its_room() {
    let hotel = TestHotel::deluxe(1).await;
    let manager = hotel.reservations();
    let stale = manager.create(hotel.request(1, 3)).await.unwrap();

    hotel.clock.advance(Duration::minutes(20));

    let replacement = manager.create(hotel.request(2, 4)).await.unwrap();
    assert_eq!(replacement.room.room_id, stale.room.room_id);

    let snapshot = hotel.store.snapshot().await;
    assert_eq!(
        snapshot.reservation(stale.id).unwrap().status,
        ReservationStatus::Expired
    );
}

#[tokio::test]
async fn hold_duration_is_configurable() {
    let hotel = TestHotel::deluxe(1).await;
    let env = hotel.env.clone().with_hold_duration(Duration::minutes(5));
    let reservation = hotel_core::ReservationManager::new(env)
        .create(hotel.request(1, 3))
        .await
        .unwrap();
    assert_eq!(reservation.expires_at - reservation.created_at, Duration::minutes(5));
}
