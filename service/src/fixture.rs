//! Fixtures of [`Service`] tests.

use common::{
    money::Currency,
    operations::{Authorize, By, Insert, Select},
    Date, DateTime, Money,
};
use jsonwebtoken::DecodingKey;

use crate::{
    domain::{
        booking, fee, listing,
        payment::MethodRef,
        user, Booking, Listing, Rating,
    },
    infra::{
        notification::Recorder,
        payment::{Charge, Hold, Sandbox, SandboxConfig},
        Database as _, Gateway as _, Memory,
    },
    Config, Service,
};

/// [`Service`] under test.
pub(crate) type TestService = Service<Memory, Sandbox, Recorder>;

/// Secret the test [JWT]s are signed with.
///
/// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
pub(crate) const JWT_SECRET: &[u8] = b"fairway";

/// Creates a new [`TestService`] with a default [`Sandbox`].
pub(crate) fn service() -> TestService {
    service_with(SandboxConfig::default())
}

/// Creates a new [`TestService`] with a [`Sandbox`] of the provided
/// [`SandboxConfig`].
pub(crate) fn service_with(sandbox: SandboxConfig) -> TestService {
    Service {
        config: Config {
            jwt_decoding_key: DecodingKey::from_secret(JWT_SECRET),
            fees: fee::Calculator::default(),
            publish_overdue_reviews: Default::default(),
            release_pending_deposits: Default::default(),
        },
        database: Memory::default(),
        payments: Sandbox::new(sandbox),
        notifier: Recorder::default(),
    }
}

/// Parses the provided USD amount.
pub(crate) fn usd(amount: &str) -> Money {
    Money {
        amount: amount.parse().unwrap(),
        currency: Currency::Usd,
    }
}

/// Returns the [`Date`] the provided number of `days` from today.
pub(crate) fn day(days: i64) -> Date {
    Date::today().checked_add_days(days).unwrap()
}

/// Returns a [`booking::DateRange`] between the provided days from today.
pub(crate) fn dates(start: i64, end: i64) -> booking::DateRange {
    booking::DateRange::new(day(start), day(end)).unwrap()
}

/// Returns a [`MethodRef`] of a test card.
pub(crate) fn card() -> MethodRef {
    MethodRef::new("pm_card_visa").unwrap()
}

/// Stores a new active driver [`Listing`] of a new owner.
///
/// Priced at 80/day, 450/week with a 200 deposit and a 15 delivery fee.
pub(crate) async fn listing(
    svc: &TestService,
    mode: listing::BookingMode,
    policy: listing::CancellationPolicy,
) -> Listing {
    let listing = Listing {
        id: listing::Id::new(),
        owner_id: user::Id::new(),
        title: listing::Title::new("TaylorMade Stealth 2 driver").unwrap(),
        club: listing::Club {
            kind: listing::ClubKind::Driver,
            brand: listing::Brand::new("TaylorMade").unwrap(),
            handedness: listing::Handedness::Right,
            flex: Some(listing::Flex::Stiff),
            condition: listing::Condition::Excellent,
        },
        pricing: listing::Pricing {
            daily_rate: usd("80"),
            weekly_rate: Some(usd("450")),
            security_deposit: usd("200"),
            delivery_fee: Some(usd("15")),
        },
        window: listing::RentalWindow::default(),
        booking_mode: mode,
        cancellation_policy: policy,
        is_active: true,
        view_count: 0,
        booking_count: 0,
        rating: Rating::default(),
        created_at: DateTime::now().coerce(),
    };
    svc.database().execute(Insert(listing.clone())).await.unwrap();
    listing
}

/// Stores a new [`Booking`] of the provided [`Listing`] in the provided
/// [`booking::Status`], authorizing its payments directly in the [`Sandbox`].
pub(crate) async fn booking(
    svc: &TestService,
    listing: &Listing,
    dates: booking::DateRange,
    status: booking::Status,
) -> Booking {
    let pricing = booking::Pricing::quote(
        &listing.pricing,
        dates.days(),
        booking::PickupMethod::Pickup,
        &svc.config().fees,
    )
    .unwrap();
    let now = DateTime::now();
    let (id, renter_id) = (booking::Id::new(), user::Id::new());
    let charge_id = svc
        .payments()
        .execute(Authorize(Charge {
            booking_id: id,
            payer_id: renter_id,
            method: card(),
            amount: pricing.total_amount,
        }))
        .await
        .unwrap();
    let hold_id = svc
        .payments()
        .execute(Authorize(Hold {
            booking_id: id,
            payer_id: renter_id,
            method: card(),
            amount: pricing.security_deposit,
        }))
        .await
        .unwrap();
    let booking = Booking {
        id,
        listing_id: listing.id,
        renter_id,
        owner_id: listing.owner_id,
        dates,
        pricing,
        charge_id,
        deposit: booking::Deposit {
            hold_id: Some(hold_id),
            released_at: None,
            captured: None,
        },
        status,
        pickup: booking::Pickup {
            method: booking::PickupMethod::Pickup,
            address: None,
        },
        message: None,
        decline_reason: None,
        cancellation: None,
        renter_reviewed: false,
        owner_reviewed: false,
        created_at: now.coerce(),
        confirmed_at: None,
        started_at: None,
        completed_at: (status == booking::Status::Completed)
            .then(|| now.coerce()),
        declined_at: None,
    };
    svc.database().execute(Insert(booking.clone())).await.unwrap();
    booking
}

/// Reloads the [`Booking`] with the provided ID.
pub(crate) async fn reload_booking(
    svc: &TestService,
    id: booking::Id,
) -> Booking {
    svc.database()
        .execute(Select(By::<Option<Booking>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
}

/// Reloads the [`Listing`] with the provided ID.
pub(crate) async fn reload_listing(
    svc: &TestService,
    id: listing::Id,
) -> Listing {
    svc.database()
        .execute(Select(By::<Option<Listing>, _>::new(id)))
        .await
        .unwrap()
        .unwrap()
}
