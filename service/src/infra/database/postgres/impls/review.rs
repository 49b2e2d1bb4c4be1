//! [`Review`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{booking, listing, rating::Score, review, Review},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns decoded by [`from_row()`].
const COLUMNS: &str = "\
    id, booking_id, listing_id, reviewer_id, reviewee_id, kind, overall, \
    equipment_quality, cleanliness, communication, accuracy, value, \
    respect, timeliness, condition_on_return, \
    text, feedback, response, responded_at, response_locked_at, \
    published_at, flagged_at, created_at";

/// Decodes a [`Review`] from the provided [`Row`].
fn from_row(row: &Row) -> Review {
    let score = |col: &str| {
        row.get::<_, Option<i16>>(col)
            .map(|v| Score::try_from(v).expect("`score` out of range"))
    };

    let kind: review::Kind = row.get("kind");
    let details = match kind {
        review::Kind::Listing => review::Details::Listing {
            equipment_quality: score("equipment_quality"),
            cleanliness: score("cleanliness"),
            communication: score("communication"),
            accuracy: score("accuracy"),
            value: score("value"),
        },
        review::Kind::Renter => review::Details::Renter {
            respect: score("respect"),
            timeliness: score("timeliness"),
            condition_on_return: score("condition_on_return"),
        },
    };
    let response = match (
        row.get::<_, Option<review::ResponseText>>("response"),
        row.get::<_, Option<review::ResponseDateTime>>("responded_at"),
        row.get::<_, Option<review::ResponseLockDateTime>>(
            "response_locked_at",
        ),
    ) {
        (Some(text), Some(responded_at), Some(locked_at)) => {
            Some(review::Response {
                text,
                responded_at,
                locked_at,
            })
        }
        _ => None,
    };

    Review {
        id: row.get("id"),
        booking_id: row.get("booking_id"),
        listing_id: row.get("listing_id"),
        reviewer_id: row.get("reviewer_id"),
        reviewee_id: row.get("reviewee_id"),
        kind,
        overall: score("overall").expect("`overall` is NOT NULL"),
        details,
        text: row.get("text"),
        feedback: row.get("feedback"),
        response,
        published_at: row.get("published_at"),
        flagged_at: row.get("flagged_at"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Review>, review::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Review>, review::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: review::Id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM reviews WHERE id = $1::UUID");
        self.query_opt(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Review>, booking::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, booking::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: booking::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reviews \
             WHERE booking_id = $1::UUID \
             ORDER BY created_at",
        );
        Ok(self
            .query(sql.as_str(), &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Review>, listing::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: listing::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reviews \
             WHERE listing_id = $1::UUID \
               AND kind = $2::INT2 \
               AND published_at IS NOT NULL \
             ORDER BY published_at DESC",
        );
        Ok(self
            .query(sql.as_str(), &[&id, &review::Kind::Listing])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Select<By<Vec<Review>, read::review::Overdue>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Review>, read::review::Overdue>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::review::Overdue { ended_by } = by.into_inner();

        let columns = COLUMNS
            .split(", ")
            .map(|c| format!("r.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} \
             FROM reviews AS r \
             INNER JOIN bookings AS b ON b.id = r.booking_id \
             WHERE r.published_at IS NULL \
               AND b.status = $1::INT2 \
               AND b.end_date <= $2::DATE \
             LIMIT 100",
        );
        Ok(self
            .query(
                sql.as_str(),
                &[&booking::Status::Completed, &ended_by],
            )
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Review>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(review): Insert<Review>,
    ) -> Result<Self::Ok, Self::Err> {
        let Review {
            id,
            booking_id,
            listing_id,
            reviewer_id,
            reviewee_id,
            kind,
            overall,
            details,
            text,
            feedback,
            response,
            published_at,
            flagged_at,
            created_at,
        } = review;

        let score = |s: Option<Score>| s.map(|s| i16::from(s.get()));
        let mut listing_scores = [None; 5];
        let mut renter_scores = [None; 3];
        match details {
            review::Details::Listing {
                equipment_quality,
                cleanliness,
                communication,
                accuracy,
                value,
            } => {
                listing_scores = [
                    equipment_quality,
                    cleanliness,
                    communication,
                    accuracy,
                    value,
                ]
                .map(score);
            }
            review::Details::Renter {
                respect,
                timeliness,
                condition_on_return,
            } => {
                renter_scores =
                    [respect, timeliness, condition_on_return].map(score);
            }
        }
        let overall = i16::from(overall.get());
        let (response, responded_at, response_locked_at) = match response {
            Some(r) => (Some(r.text), Some(r.responded_at), Some(r.locked_at)),
            None => (None, None, None),
        };

        const SQL: &str = "\
            INSERT INTO reviews (\
                id, booking_id, listing_id, reviewer_id, reviewee_id, \
                kind, overall, \
                equipment_quality, cleanliness, communication, accuracy, \
                value, \
                respect, timeliness, condition_on_return, \
                text, feedback, response, responded_at, response_locked_at, \
                published_at, flagged_at, created_at\
            ) VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::UUID, $5::UUID, \
                $6::INT2, $7::INT2, \
                $8::INT2, $9::INT2, $10::INT2, $11::INT2, \
                $12::INT2, \
                $13::INT2, $14::INT2, $15::INT2, \
                $16::TEXT, $17::TEXT, $18::TEXT, $19::TIMESTAMPTZ, \
                $20::TIMESTAMPTZ, \
                $21::TIMESTAMPTZ, $22::TIMESTAMPTZ, $23::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &booking_id,
                &listing_id,
                &reviewer_id,
                &reviewee_id,
                &kind,
                &overall,
                &listing_scores[0],
                &listing_scores[1],
                &listing_scores[2],
                &listing_scores[3],
                &listing_scores[4],
                &renter_scores[0],
                &renter_scores[1],
                &renter_scores[2],
                &text,
                &feedback,
                &response,
                &responded_at,
                &response_locked_at,
                &published_at,
                &flagged_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<(booking::Id, review::PublicationDateTime)>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Review>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, at)): Update<(booking::Id, review::PublicationDateTime)>,
    ) -> Result<Self::Ok, Self::Err> {
        let sql = format!(
            "UPDATE reviews \
             SET published_at = $2::TIMESTAMPTZ \
             WHERE booking_id = $1::UUID \
               AND published_at IS NULL \
             RETURNING {COLUMNS}",
        );
        Ok(self
            .query(sql.as_str(), &[&id, &at])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Update<(review::Id, review::Response)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, response)): Update<(review::Id, review::Response)>,
    ) -> Result<Self::Ok, Self::Err> {
        let review::Response {
            text,
            responded_at,
            locked_at,
        } = response;

        const SQL: &str = "\
            UPDATE reviews \
            SET response = $2::TEXT, \
                responded_at = $3::TIMESTAMPTZ, \
                response_locked_at = $4::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &text, &responded_at, &locked_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<(review::Id, review::FlagDateTime)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, at)): Update<(review::Id, review::FlagDateTime)>,
    ) -> Result<Self::Ok, Self::Err> {
        // The first flag wins.
        const SQL: &str = "\
            UPDATE reviews \
            SET flagged_at = COALESCE(flagged_at, $2::TIMESTAMPTZ) \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
