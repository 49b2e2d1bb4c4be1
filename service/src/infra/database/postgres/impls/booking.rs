//! [`Booking`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Date, Money,
};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, Booking},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns decoded by [`from_row()`].
const COLUMNS: &str = "\
    id, listing_id, renter_id, owner_id, \
    start_date, end_date, \
    currency, daily_rate, total_rental_fee, service_fee, platform_fee, \
    owner_earnings, security_deposit, delivery_fee, total_amount, \
    charge_intent_id, \
    deposit_hold_id, deposit_released_at, deposit_captured, \
    status, pickup_method, delivery_address, \
    message, decline_reason, \
    cancelled_by, refund_amount, cancelled_at, \
    renter_reviewed, owner_reviewed, \
    created_at, confirmed_at, started_at, completed_at, declined_at";

/// Decodes a [`Booking`] from the provided [`Row`].
fn from_row(row: &Row) -> Booking {
    let currency = row.get("currency");
    let money = |amount| Money { amount, currency };

    let cancellation = match (
        row.get::<_, Option<booking::Party>>("cancelled_by"),
        row.get::<_, Option<booking::CancellationDateTime>>("cancelled_at"),
    ) {
        (Some(by), Some(at)) => Some(booking::Cancellation {
            by,
            refund: money(
                row.get::<_, Option<Decimal>>("refund_amount")
                    .unwrap_or_default(),
            ),
            at,
        }),
        _ => None,
    };

    Booking {
        id: row.get("id"),
        listing_id: row.get("listing_id"),
        renter_id: row.get("renter_id"),
        owner_id: row.get("owner_id"),
        dates: booking::DateRange::new(
            row.get::<_, Date>("start_date"),
            row.get::<_, Date>("end_date"),
        )
        .expect("`start_date < end_date` is checked by the schema"),
        pricing: booking::Pricing {
            daily_rate: money(row.get("daily_rate")),
            total_rental_fee: money(row.get("total_rental_fee")),
            service_fee: money(row.get("service_fee")),
            platform_fee: money(row.get("platform_fee")),
            owner_earnings: money(row.get("owner_earnings")),
            security_deposit: money(row.get("security_deposit")),
            delivery_fee: money(row.get("delivery_fee")),
            total_amount: money(row.get("total_amount")),
        },
        charge_id: row.get("charge_intent_id"),
        deposit: booking::Deposit {
            hold_id: row.get("deposit_hold_id"),
            released_at: row.get("deposit_released_at"),
            captured: row
                .get::<_, Option<Decimal>>("deposit_captured")
                .map(money),
        },
        status: row.get("status"),
        pickup: booking::Pickup {
            method: row.get("pickup_method"),
            address: row.get("delivery_address"),
        },
        message: row.get("message"),
        decline_reason: row.get("decline_reason"),
        cancellation,
        renter_reviewed: row.get("renter_reviewed"),
        owner_reviewed: row.get("owner_reviewed"),
        created_at: row.get("created_at"),
        confirmed_at: row.get("confirmed_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        declined_at: row.get("declined_at"),
    }
}

impl<C> Database<Select<By<Option<Booking>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Booking>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM bookings WHERE id = $1::UUID");
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Insert<Booking>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(booking): Insert<Booking>,
    ) -> Result<Self::Ok, Self::Err> {
        let Booking {
            id,
            listing_id,
            renter_id,
            owner_id,
            dates,
            pricing,
            charge_id,
            deposit,
            status,
            pickup,
            message,
            decline_reason,
            cancellation,
            renter_reviewed,
            owner_reviewed,
            created_at,
            confirmed_at,
            started_at,
            completed_at,
            declined_at,
        } = booking;
        let (start_date, end_date) = (dates.start(), dates.end());
        let captured = deposit.captured.map(|m| m.amount);
        let cancelled_by = cancellation.map(|c| c.by);
        let refund_amount = cancellation.map(|c| c.refund.amount);
        let cancelled_at = cancellation.map(|c| c.at);

        const SQL: &str = "\
            INSERT INTO bookings (\
                id, listing_id, renter_id, owner_id, \
                start_date, end_date, \
                currency, daily_rate, total_rental_fee, service_fee, \
                platform_fee, owner_earnings, security_deposit, \
                delivery_fee, total_amount, \
                charge_intent_id, \
                deposit_hold_id, deposit_released_at, deposit_captured, \
                status, pickup_method, delivery_address, \
                message, decline_reason, \
                cancelled_by, refund_amount, cancelled_at, \
                renter_reviewed, owner_reviewed, \
                created_at, confirmed_at, started_at, completed_at, \
                declined_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, \
                $5::DATE, $6::DATE, \
                $7::INT2, $8::NUMERIC, $9::NUMERIC, $10::NUMERIC, \
                $11::NUMERIC, $12::NUMERIC, $13::NUMERIC, \
                $14::NUMERIC, $15::NUMERIC, \
                $16::VARCHAR, \
                $17::VARCHAR, $18::TIMESTAMPTZ, $19::NUMERIC, \
                $20::INT2, $21::INT2, $22::VARCHAR, \
                $23::TEXT, $24::TEXT, \
                $25::INT2, $26::NUMERIC, $27::TIMESTAMPTZ, \
                $28::BOOLEAN, $29::BOOLEAN, \
                $30::TIMESTAMPTZ, $31::TIMESTAMPTZ, $32::TIMESTAMPTZ, \
                $33::TIMESTAMPTZ, $34::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &listing_id,
                &renter_id,
                &owner_id,
                &start_date,
                &end_date,
                &pricing.total_amount.currency,
                &pricing.daily_rate.amount,
                &pricing.total_rental_fee.amount,
                &pricing.service_fee.amount,
                &pricing.platform_fee.amount,
                &pricing.owner_earnings.amount,
                &pricing.security_deposit.amount,
                &pricing.delivery_fee.amount,
                &pricing.total_amount.amount,
                &charge_id,
                &deposit.hold_id,
                &deposit.released_at,
                &captured,
                &status,
                &pickup.method,
                &pickup.address,
                &message,
                &decline_reason,
                &cancelled_by,
                &refund_amount,
                &cancelled_at,
                &renter_reviewed,
                &owner_reviewed,
                &created_at,
                &confirmed_at,
                &started_at,
                &completed_at,
                &declined_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<booking::Transition>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(transition): Update<booking::Transition>,
    ) -> Result<Self::Ok, Self::Err> {
        let booking::Transition { booking, from } = transition;
        let cancelled_by = booking.cancellation.map(|c| c.by);
        let refund_amount = booking.cancellation.map(|c| c.refund.amount);
        let cancelled_at = booking.cancellation.map(|c| c.at);

        // Only lifecycle columns are written, the pricing snapshot is frozen.
        const SQL: &str = "\
            UPDATE bookings \
            SET status = $3::INT2, \
                decline_reason = $4::TEXT, \
                cancelled_by = $5::INT2, \
                refund_amount = $6::NUMERIC, \
                cancelled_at = $7::TIMESTAMPTZ, \
                confirmed_at = $8::TIMESTAMPTZ, \
                started_at = $9::TIMESTAMPTZ, \
                completed_at = $10::TIMESTAMPTZ, \
                declined_at = $11::TIMESTAMPTZ \
            WHERE id = $1::UUID \
              AND status = $2::INT2";
        self.exec(
            SQL,
            &[
                &booking.id,
                &from,
                &booking.status,
                &booking.decline_reason,
                &cancelled_by,
                &refund_amount,
                &cancelled_at,
                &booking.confirmed_at,
                &booking.started_at,
                &booking.completed_at,
                &booking.declined_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|n| n > 0)
    }
}

impl<C> Database<Update<booking::Settle>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(settle): Update<booking::Settle>,
    ) -> Result<Self::Ok, Self::Err> {
        let booking::Settle {
            booking_id,
            settlement,
        } = settle;

        const OUTSTANDING: &str = "\
            WHERE id = $1::UUID \
              AND deposit_hold_id IS NOT NULL \
              AND deposit_released_at IS NULL \
              AND deposit_captured IS NULL";
        let updated = match settlement {
            booking::Settlement::Capture(amount) => {
                let occupying =
                    [booking::Status::Confirmed, booking::Status::InProgress];
                let sql = format!(
                    "UPDATE bookings \
                     SET deposit_captured = $2::NUMERIC \
                     {OUTSTANDING} \
                       AND status = ANY($3::INT2[])",
                );
                self.exec(
                    sql.as_str(),
                    &[&booking_id, &amount.amount, &&occupying[..]],
                )
                .await
            }
            booking::Settlement::Release(at) => {
                let sql = format!(
                    "UPDATE bookings \
                     SET deposit_released_at = $2::TIMESTAMPTZ \
                     {OUTSTANDING}",
                );
                self.exec(sql.as_str(), &[&booking_id, &at]).await
            }
        };
        updated.map_err(tracerr::wrap!()).map(|n| n > 0)
    }
}

impl<C> Database<Update<booking::Unsettle>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(booking::Unsettle(settle)): Update<booking::Unsettle>,
    ) -> Result<Self::Ok, Self::Err> {
        let booking::Settle {
            booking_id,
            settlement,
        } = settle;

        let updated = match settlement {
            booking::Settlement::Capture(amount) => {
                const SQL: &str = "\
                    UPDATE bookings \
                    SET deposit_captured = NULL \
                    WHERE id = $1::UUID \
                      AND deposit_captured = $2::NUMERIC";
                self.exec(SQL, &[&booking_id, &amount.amount]).await
            }
            booking::Settlement::Release(at) => {
                const SQL: &str = "\
                    UPDATE bookings \
                    SET deposit_released_at = NULL \
                    WHERE id = $1::UUID \
                      AND deposit_released_at = $2::TIMESTAMPTZ";
                self.exec(SQL, &[&booking_id, &at]).await
            }
        };
        updated.map_err(tracerr::wrap!()).map(|n| n > 0)
    }
}

impl<C> Database<Update<(booking::Id, booking::Reviewed)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, booking::Reviewed(party))): Update<(
            booking::Id,
            booking::Reviewed,
        )>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = match party {
            booking::Party::Renter => {
                "UPDATE bookings SET renter_reviewed = TRUE WHERE id = $1::UUID"
            }
            booking::Party::Owner => {
                "UPDATE bookings SET owner_reviewed = TRUE WHERE id = $1::UUID"
            }
        };
        self.exec(sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Booking, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Booking, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO bookings_lock (id) \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE \
            SET locked_at = NOW()";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Vec<booking::Id>, read::booking::Occupying>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<booking::Id>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<booking::Id>, read::booking::Occupying>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::Occupying {
            listing_id,
            dates,
            except,
        } = by.into_inner();
        let (start, end) = (dates.start(), dates.end());

        const SQL: &str = "\
            SELECT id \
            FROM bookings \
            WHERE listing_id = $1::UUID \
              AND status = ANY($2::INT2[]) \
              AND start_date <= $4::DATE \
              AND end_date >= $3::DATE \
              AND ($5::UUID IS NULL OR id <> $5::UUID)";
        let occupying =
            [booking::Status::Confirmed, booking::Status::InProgress];
        Ok(self
            .query(SQL, &[&listing_id, &&occupying[..], &start, &end, &except])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| row.get("id"))
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::Participant>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Booking>, read::booking::Participant>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::booking::Participant { user_id, party } = by.into_inner();

        let filter = match party {
            Some(booking::Party::Renter) => "renter_id = $1::UUID",
            Some(booking::Party::Owner) => "owner_id = $1::UUID",
            None => "(renter_id = $1::UUID OR owner_id = $1::UUID)",
        };
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings \
             WHERE {filter} \
             ORDER BY created_at DESC",
        );
        Ok(self
            .query(sql.as_str(), &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Booking>, read::booking::PendingRelease>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Booking>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Booking>, read::booking::PendingRelease>>,
    ) -> Result<Self::Ok, Self::Err> {
        let terminal = [
            booking::Status::Completed,
            booking::Status::Cancelled,
            booking::Status::Declined,
        ];
        let sql = format!(
            "SELECT {COLUMNS} \
             FROM bookings \
             WHERE status = ANY($1::INT2[]) \
               AND deposit_hold_id IS NOT NULL \
               AND deposit_released_at IS NULL \
               AND deposit_captured IS NULL \
             LIMIT 100",
        );
        Ok(self
            .query(sql.as_str(), &[&&terminal[..]])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}
