//! Domain types for the hotel booking core.
//!
//! Identifiers, status enums and the four aggregates the core reads and
//! writes: rooms (status only), reservations, bookings and payments.

use crate::money::Money;
use crate::stay::StayWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a physical room
    RoomId
);
uuid_id!(
    /// Unique identifier for a room type (catalog entry)
    RoomTypeId
);
uuid_id!(
    /// Unique identifier for a user (guest or staff)
    UserId
);
uuid_id!(
    /// Unique identifier for a reservation (soft hold)
    ReservationId
);
uuid_id!(
    /// Unique identifier for a booking (firm reservation)
    BookingId
);
uuid_id!(
    /// Unique identifier for a payment
    PaymentId
);

// ============================================================================
// Status enums
// ============================================================================

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Convert status to its database/wire string.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse status from its database/wire string.
            #[must_use]
            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Coarse operational status of a physical room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Clean and free
    Available,
    /// Held by a firm booking that has not checked in yet
    Reserved,
    /// Guest in house
    Occupied,
    /// Housekeeping in progress
    Cleaning,
    /// Vacated, waiting for housekeeping
    Dirty,
    /// Out of order; never allocatable
    Maintenance,
}

string_enum!(RoomStatus {
    Available => "available",
    Reserved => "reserved",
    Occupied => "occupied",
    Cleaning => "cleaning",
    Dirty => "dirty",
    Maintenance => "maintenance",
});

/// Reservation (soft hold) status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Holding a room until `expires_at`
    Pending,
    /// Converted into a booking
    Confirmed,
    /// Deadline passed without a booking
    Expired,
    /// Cancelled by the guest or staff
    Cancelled,
}

string_enum!(ReservationStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Expired => "expired",
    Cancelled => "cancelled",
});

/// Booking (firm reservation) status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, payment not yet attempted
    PendingPayment,
    /// Paid (or card captured)
    Confirmed,
    /// Confirmed, cash to be collected at the desk
    ConfirmedUnpaid,
    /// Guest in house
    CheckedIn,
    /// Guest departed
    CheckedOut,
    /// Cancelled before arrival
    Cancelled,
}

string_enum!(BookingStatus {
    PendingPayment => "pending_payment",
    Confirmed => "confirmed",
    ConfirmedUnpaid => "confirmed_unpaid",
    CheckedIn => "checked_in",
    CheckedOut => "checked_out",
    Cancelled => "cancelled",
});

/// Payment status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting collection
    Pending,
    /// Captured
    Completed,
    /// Never collected
    Failed,
    /// Returned to the guest
    Refunded,
}

string_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Refunded => "refunded",
});

/// How the guest pays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Card, captured immediately (simulated)
    Card,
    /// Cash, collected by staff later
    Cash,
}

string_enum!(PaymentMethod {
    Card => "Card",
    Cash => "Cash",
});

/// Role carried by an authenticated session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Hotel guest
    Guest,
    /// Administrator
    Admin,
    /// Manager
    Manager,
    /// Front desk
    Receptionist,
    /// Housekeeping staff
    Housekeeping,
}

string_enum!(Role {
    Guest => "guest",
    Admin => "admin",
    Manager => "manager",
    Receptionist => "receptionist",
    Housekeeping => "housekeeping",
});

impl Role {
    /// Any non-guest role.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        !matches!(self, Self::Guest)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Room type catalog entry. Read-only from the booking core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomType {
    /// Identifier
    pub id: RoomTypeId,
    /// Display name ("Deluxe")
    pub name: String,
    /// Description
    pub description: String,
    /// Nightly base price
    pub base_price: Money,
    /// Maximum adults per room
    pub max_adults: u32,
    /// Maximum children per room
    pub max_children: u32,
    /// Discount percentage in `0..=100`
    pub discount_percent: u32,
    /// Amenity names
    pub amenities: Vec<String>,
}

/// A physical room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Identifier
    pub id: RoomId,
    /// Door number ("101")
    pub number: String,
    /// Catalog entry
    pub room_type_id: RoomTypeId,
    /// Floor
    pub floor: i32,
    /// Live operational status
    pub status: RoomStatus,
}

// ============================================================================
// Aggregates
// ============================================================================

/// One room on a reservation or booking. Owned by its parent aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomLine {
    /// Room
    pub room_id: RoomId,
    /// Nightly price after discount
    pub price_per_night: Money,
    /// Number of nights
    pub nights: u32,
    /// `price_per_night × nights`
    pub subtotal: Money,
}

/// A time-boxed soft hold on one room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reservation {
    /// Identifier
    pub id: ReservationId,
    /// Human-readable code ("RES-260301-7KQ2XD")
    pub code: String,
    /// Guest holding the room
    pub guest_id: UserId,
    /// Requested room type
    pub room_type_id: RoomTypeId,
    /// Requested dates
    pub stay: StayWindow,
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
    /// The held room
    pub room: RoomLine,
    /// Sum of line subtotals
    pub subtotal: Money,
    /// 15% tax, rounded to whole units
    pub tax: Money,
    /// `subtotal + tax`
    pub total: Money,
    /// Persisted status (see `effective_status` for lazy expiry)
    pub status: ReservationStatus,
    /// Hold deadline
    pub expires_at: DateTime<Utc>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A firm, payment-backed allocation of rooms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Booking {
    /// Identifier
    pub id: BookingId,
    /// Human-readable code ("BKG-260301-Q9D2MZ")
    pub code: String,
    /// Originating hold, absent for walk-ins
    pub reservation_id: Option<ReservationId>,
    /// Guest
    pub guest_id: UserId,
    /// Dates
    pub stay: StayWindow,
    /// Adults
    pub adults: u32,
    /// Children
    pub children: u32,
    /// Booked rooms
    pub rooms: Vec<RoomLine>,
    /// Sum of line subtotals
    pub subtotal: Money,
    /// 15% tax, rounded to whole units
    pub tax: Money,
    /// `subtotal + tax`
    pub total: Money,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Payment method chosen at creation
    pub payment_method: PaymentMethod,
    /// Linked payment
    pub payment_id: Option<PaymentId>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Ids of every booked room.
    #[must_use]
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|line| line.room_id).collect()
    }
}

/// Payment record, one per booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Payment {
    /// Identifier
    pub id: PaymentId,
    /// Booking paid for
    pub booking_id: BookingId,
    /// Payer
    pub guest_id: UserId,
    /// Amount
    pub amount: Money,
    /// Method
    pub method: PaymentMethod,
    /// Status
    pub status: PaymentStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// When the money was captured
    pub completed_at: Option<DateTime<Utc>>,
}

/// Authenticated session behind a bearer token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Opaque bearer token
    pub token: Uuid,
    /// User the token belongs to
    pub user_id: UserId,
    /// Role of that user
    pub role: Role,
    /// Token expiry
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Caller identity carried by this session.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            role: self.role,
        }
    }
}

/// Who is performing an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Authenticated user
    pub user_id: UserId,
    /// Role of that user
    pub role: Role,
}

impl Actor {
    /// Whether the actor may see or act on a record owned by `owner`.
    #[must_use]
    pub fn may_access(&self, owner: UserId) -> bool {
        self.role.is_staff() || self.user_id == owner
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Filter for reservation listings. Status matches the *effective* status.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReservationFilter {
    /// Only this guest's reservations
    pub guest_id: Option<UserId>,
    /// Only this effective status
    pub status: Option<ReservationStatus>,
}

/// Filter for booking listings.
#[derive(Clone, Copy, Debug, Default)]
pub struct BookingFilter {
    /// Only this guest's bookings
    pub guest_id: Option<UserId>,
    /// Only this status
    pub status: Option<BookingStatus>,
}

/// 1-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// Page number, starting at 1
    pub page: u32,
    /// Page size
    pub limit: u32,
}

impl Page {
    /// Largest accepted page size.
    pub const MAX_LIMIT: u32 = 100;

    /// Builds a page request, clamping to sane bounds.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of results plus the total count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paged<T> {
    /// Rows on this page
    pub items: Vec<T>,
    /// Total rows matching the filter
    pub total: u64,
    /// The page that was requested
    pub page: Page,
}

impl<T> Paged<T> {
    /// Number of pages for `total` rows.
    #[must_use]
    pub const fn pages(&self) -> u64 {
        self.total.div_ceil(self.page.limit as u64)
    }
}
