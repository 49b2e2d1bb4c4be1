//! User [`Rating`]-related [`Database`] implementations.

use common::operations::{By, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{rating::Score, user, Rating},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Select<By<Vec<Score>, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Score>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Score>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT overall \
            FROM reviews \
            WHERE reviewee_id = $1::UUID \
              AND published_at IS NOT NULL";
        Ok(self
            .query(SQL, &[&id])
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

impl<C> Database<Select<By<Rating, user::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Rating;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Rating, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT average, total \
            FROM user_ratings \
            WHERE user_id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Rating {
                average: row.get("average"),
                total: u32::try_from(row.get::<_, i32>("total"))
                    .expect("`total` overflow"),
            })
            .unwrap_or_default())
    }
}

impl<C> Database<Update<(user::Id, Rating)>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update((id, rating)): Update<(user::Id, Rating)>,
    ) -> Result<Self::Ok, Self::Err> {
        let total = i32::try_from(rating.total).unwrap_or(i32::MAX);

        const SQL: &str = "\
            INSERT INTO user_ratings (user_id, average, total) \
            VALUES ($1::UUID, $2::NUMERIC, $3::INT4) \
            ON CONFLICT (user_id) DO UPDATE \
            SET average = EXCLUDED.average, \
                total = EXCLUDED.total";
        self.exec(SQL, &[&id, &rating.average, &total])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
