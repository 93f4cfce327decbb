//! Racing requests for the same room.

#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use hotel_core::{HotelError, PaymentMethod, RoomStatus, StayWindow};
use hotel_testing::TestHotel;
use hotel_testing::fixtures::stay;
use hotel_testing::properties::stays;
use proptest::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_holds_on_last_room_admit_exactly_one() {
    let hotel = TestHotel::deluxe(1).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = hotel.reservations();
            let request = hotel.request(1, 3);
            tokio::spawn(async move { manager.create(request).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, HotelError::NoAvailability(_)))
    );
    assert_eq!(hotel.store.snapshot().await.reservations.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commits_leave_no_residue_for_the_loser() {
    let hotel = TestHotel::deluxe(1).await;
    let room_id = hotel.rooms[0].id;
    let reservation = hotel.reservations().create(hotel.request(1, 3)).await.unwrap();
    hotel.clock.advance(chrono::Duration::minutes(20));

    // The hold has lapsed, so a walk-in may race the stale conversion.
    let stale = TestHotel::booking_for(&reservation, PaymentMethod::Card);
    let walk_in = hotel.walk_in(room_id, stay(2, 3), PaymentMethod::Card);

    let a = tokio::spawn({
        let manager = hotel.bookings();
        async move { manager.create(stale).await }
    });
    let b = tokio::spawn({
        let manager = hotel.bookings();
        async move { manager.create(walk_in).await }
    });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.is_err());
    let booking = b.unwrap();

    let snapshot = hotel.store.snapshot().await;
    assert_eq!(snapshot.bookings.len(), 1);
    assert_eq!(snapshot.payments.len(), 1);
    assert_eq!(snapshot.payments[0].booking_id, booking.id);
    assert_eq!(snapshot.room(room_id).unwrap().status, RoomStatus::Reserved);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_walk_ins_for_one_room_admit_exactly_one() {
    let hotel = TestHotel::deluxe(1).await;
    let room_id = hotel.rooms[0].id;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let manager = hotel.bookings();
            let request = hotel.walk_in(room_id, stay(5, 8), PaymentMethod::Cash);
            tokio::spawn(async move { manager.create(request).await })
        })
        .collect();
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let snapshot = hotel.store.snapshot().await;
    assert_eq!(snapshot.bookings.len(), 1);
    assert_eq!(snapshot.payments.len(), 1);
}

fn holds_for(a: StayWindow, b: StayWindow) -> (bool, bool) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let hotel = TestHotel::deluxe(1).await;
        let manager = hotel.reservations();
        let mut first = hotel.request(1, 2);
        first.stay = a;
        let mut second = hotel.request(1, 2);
        second.stay = b;
        (
            manager.create(first).await.is_ok(),
            manager.create(second).await.is_ok(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn second_hold_succeeds_iff_windows_are_disjoint(a in stays(), b in stays()) {
        let (first, second) = holds_for(a, b);
        prop_assert!(first);
        prop_assert_eq!(second, !a.overlaps(&b));
    }
}
