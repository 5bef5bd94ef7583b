use common::operations::{Allocate, By};
use tracerr::Traced;

use crate::{
    domain::sequence,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Allocate<By<sequence::Number, sequence::Group>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = sequence::Number;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Allocate(by): Allocate<By<sequence::Number, sequence::Group>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let group: sequence::Group = by.into_inner();

        const SQL: &str = "\
            INSERT INTO sequence_controls (name, value) \
            VALUES ($1::VARCHAR, 1) \
            ON CONFLICT (name) DO UPDATE \
            SET value = sequence_controls.value + 1 \
            RETURNING value";
        self.query_opt(SQL, &[&group])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.expect("always exists").get("value"))
    }
}
