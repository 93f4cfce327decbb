//! Manual room status changes and their effect on same-day arrivals.

#![allow(clippy::unwrap_used)]

use chrono::Duration;
use hotel_core::environment::Clock;
use hotel_core::{CreateReservation, HotelError, RoomId, RoomStatus, StayWindow};
use hotel_testing::TestHotel;

fn tonight(hotel: &TestHotel) -> CreateReservation {
    let today = hotel
        .clock
        .now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();
    CreateReservation {
        stay: StayWindow::new(today, today + Duration::days(1)).unwrap(),
        ..hotel.request(1, 2)
    }
}

#[tokio::test]
async fn cleaned_room_takes_same_day_arrival() {
    let hotel = TestHotel::deluxe(1).await;
    let room_id = hotel.rooms[0].id;
    hotel.store.force_room_status(room_id, RoomStatus::Dirty).await;

    let err = hotel.reservations().create(tonight(&hotel)).await.unwrap_err();
    assert!(matches!(err, HotelError::NoAvailability(_)), "got {err:?}");

    let rooms = hotel.rooms();
    let room = rooms.set_status(room_id, RoomStatus::Cleaning).await.unwrap();
    assert_eq!(room.status, RoomStatus::Cleaning);
    assert!(hotel.reservations().create(tonight(&hotel)).await.is_err());

    rooms.set_status(room_id, RoomStatus::Available).await.unwrap();
    assert_eq!(rooms.get(room_id).await.unwrap().status, RoomStatus::Available);

    let reservation = hotel.reservations().create(tonight(&hotel)).await.unwrap();
    assert_eq!(reservation.room.room_id, room_id);
}

#[tokio::test]
async fn booking_owned_statuses_are_refused() {
    let hotel = TestHotel::deluxe(1).await;
    let room_id = hotel.rooms[0].id;
    let rooms = hotel.rooms();

    for status in [RoomStatus::Reserved, RoomStatus::Occupied, RoomStatus::Available] {
        let err = rooms.set_status(room_id, status).await.unwrap_err();
        assert!(matches!(err, HotelError::InvalidTransition { .. }), "got {err:?}");
    }
    assert_eq!(
        hotel.store.snapshot().await.room(room_id).unwrap().status,
        RoomStatus::Available
    );

    let err = rooms.set_status(RoomId::new(), RoomStatus::Cleaning).await.unwrap_err();
    assert!(matches!(err, HotelError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn maintenance_takes_room_out_of_the_pool() {
    let hotel = TestHotel::deluxe(1).await;
    let room_id = hotel.rooms[0].id;

    hotel
        .rooms()
        .set_status(room_id, RoomStatus::Maintenance)
        .await
        .unwrap();
    assert!(hotel.reservations().create(hotel.request(10, 12)).await.is_err());

    hotel
        .rooms()
        .set_status(room_id, RoomStatus::Available)
        .await
        .unwrap();
    hotel.reservations().create(hotel.request(10, 12)).await.unwrap();
}
