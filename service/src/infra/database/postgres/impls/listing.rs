//! [`Listing`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{listing, rating::Score, review, Listing, Rating},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Decodes a [`Listing`] from the provided [`Row`].
fn from_row(row: &Row) -> Listing {
    let currency = row.get("currency");
    let money = |amount| Money { amount, currency };
    let days = |v: i32| u16::try_from(v).expect("`days` overflow");
    let count = |v: i64| u64::try_from(v).expect("`count` overflow");

    Listing {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        club: listing::Club {
            kind: row.get("club_kind"),
            brand: row.get("brand"),
            handedness: row.get("handedness"),
            flex: row.get("flex"),
            condition: row.get("condition"),
        },
        pricing: listing::Pricing {
            daily_rate: money(row.get("daily_rate")),
            weekly_rate: row.get::<_, Option<Decimal>>("weekly_rate").map(money),
            security_deposit: money(row.get("security_deposit")),
            delivery_fee: row
                .get::<_, Option<Decimal>>("delivery_fee")
                .map(money),
        },
        window: listing::RentalWindow {
            min_days: days(row.get("min_days")),
            max_days: row.get::<_, Option<i32>>("max_days").map(days),
            advance_notice_days: days(row.get("advance_notice_days")),
        },
        booking_mode: row.get("booking_mode"),
        cancellation_policy: row.get("cancellation_policy"),
        is_active: row.get("is_active"),
        view_count: count(row.get("view_count")),
        booking_count: count(row.get("booking_count")),
        rating: Rating {
            average: row.get("rating_average"),
            total: u32::try_from(row.get::<_, i32>("rating_total"))
                .expect("`rating_total` overflow"),
        },
        created_at: row.get("created_at"),
    }
}

impl<C, IDs> Database<Select<By<HashMap<listing::Id, Listing>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[listing::Id]>,
{
    type Ok = HashMap<listing::Id, Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<listing::Id, Listing>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[listing::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, owner_id, title, \
                   club_kind, brand, handedness, flex, condition, \
                   currency, daily_rate, weekly_rate, \
                   security_deposit, delivery_fee, \
                   min_days, max_days, advance_notice_days, \
                   booking_mode, cancellation_policy, is_active, \
                   view_count, booking_count, \
                   rating_average, rating_total, \
                   created_at \
            FROM listings \
            WHERE id = ANY($1::UUID[])";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .map(|l| (l.id, l))
            .collect())
    }
}

impl<C> Database<Select<By<Option<Listing>, listing::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<listing::Id, Listing>, [listing::Id; 1]>>,
        Ok = HashMap<listing::Id, Listing>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<Listing>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(listing): Insert<Listing>,
    ) -> Result<Self::Ok, Self::Err> {
        let Listing {
            id,
            owner_id,
            title,
            club,
            pricing,
            window,
            booking_mode,
            cancellation_policy,
            is_active,
            view_count,
            booking_count,
            rating,
            created_at,
        } = listing;

        let currency = pricing.daily_rate.currency;
        let weekly_rate = pricing.weekly_rate.map(|m| m.amount);
        let delivery_fee = pricing.delivery_fee.map(|m| m.amount);
        let min_days = i32::from(window.min_days);
        let max_days = window.max_days.map(i32::from);
        let advance_notice_days = i32::from(window.advance_notice_days);
        let view_count = i64::try_from(view_count).unwrap_or(i64::MAX);
        let booking_count = i64::try_from(booking_count).unwrap_or(i64::MAX);
        let rating_total = i32::try_from(rating.total).unwrap_or(i32::MAX);

        const SQL: &str = "\
            INSERT INTO listings (\
                id, owner_id, title, \
                club_kind, brand, handedness, flex, condition, \
                currency, daily_rate, weekly_rate, \
                security_deposit, delivery_fee, \
                min_days, max_days, advance_notice_days, \
                booking_mode, cancellation_policy, is_active, \
                view_count, booking_count, \
                rating_average, rating_total, \
                created_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::VARCHAR, \
                $4::INT2, $5::VARCHAR, $6::INT2, $7::INT2, $8::INT2, \
                $9::INT2, $10::NUMERIC, $11::NUMERIC, \
                $12::NUMERIC, $13::NUMERIC, \
                $14::INT4, $15::INT4, $16::INT4, \
                $17::INT2, $18::INT2, $19::BOOLEAN, \
                $20::INT8, $21::INT8, \
                $22::NUMERIC, $23::INT4, \
                $24::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &owner_id,
                &title,
                &club.kind,
                &club.brand,
                &club.handedness,
                &club.flex,
                &club.condition,
                &currency,
                &pricing.daily_rate.amount,
                &weekly_rate,
                &pricing.security_deposit.amount,
                &delivery_fee,
                &min_days,
                &max_days,
                &advance_notice_days,
                &booking_mode,
                &cancellation_policy,
                &is_active,
                &view_count,
                &booking_count,
                &rating.average,
                &rating_total,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<(listing::Id, listing::Counter)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, counter)): Update<(listing::Id, listing::Counter)>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = match counter {
            listing::Counter::Views => {
                "UPDATE listings \
                 SET view_count = view_count + 1 \
                 WHERE id = $1::UUID"
            }
            listing::Counter::Bookings => {
                "UPDATE listings \
                 SET booking_count = booking_count + 1 \
                 WHERE id = $1::UUID"
            }
        };
        self.exec(sql, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|n| n > 0)
    }
}

impl<C> Database<Update<(listing::Id, Rating)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, rating)): Update<(listing::Id, Rating)>,
    ) -> Result<Self::Ok, Self::Err> {
        let total = i32::try_from(rating.total).unwrap_or(i32::MAX);

        const SQL: &str = "\
            UPDATE listings \
            SET rating_average = $2::NUMERIC, \
                rating_total = $3::INT4 \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &rating.average, &total])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Vec<Score>, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Score>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Score>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        const SQL: &str = "\
            SELECT overall \
            FROM reviews \
            WHERE listing_id = $1::UUID \
              AND kind = $2::INT2 \
              AND published_at IS NOT NULL";
        Ok(self
            .query(SQL, &[&id, &review::Kind::Listing])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| {
                Score::try_from(row.get::<_, i16>("overall"))
                    .expect("`overall` out of range")
            })
            .collect())
    }
}

impl<C> Database<Lock<By<Listing, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Listing, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        // Updating the conflicting row keeps it locked until the transaction
        // ends.
        const SQL: &str = "\
            INSERT INTO listings_lock (id) \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE \
            SET locked_at = NOW()";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
