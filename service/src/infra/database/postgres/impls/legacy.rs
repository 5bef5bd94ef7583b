use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{legacy, offering, student},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C>
    Database<
        Select<
            By<Option<legacy::Agreement>, (student::Id, offering::Intensity)>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<legacy::Agreement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<legacy::Agreement>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let (student_id, intensity): (student::Id, offering::Intensity) =
            by.into_inner();

        const FULL_TIME_SQL: &str = "\
            SELECT full_time_msfaa_number AS number, \
                   full_time_signed_date AS date_signed \
            FROM legacy_individuals \
            WHERE student_id = $1::UUID \
              AND full_time_msfaa_number IS NOT NULL \
              AND full_time_signed_date IS NOT NULL \
            LIMIT 1";
        const PART_TIME_SQL: &str = "\
            SELECT part_time_msfaa_number AS number, \
                   part_time_signed_date AS date_signed \
            FROM legacy_individuals \
            WHERE student_id = $1::UUID \
              AND part_time_msfaa_number IS NOT NULL \
              AND part_time_signed_date IS NOT NULL \
            LIMIT 1";
        let sql = match intensity {
            offering::Intensity::FullTime => FULL_TIME_SQL,
            offering::Intensity::PartTime => PART_TIME_SQL,
        };
        self.query_opt(sql, &[&student_id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                row.map(|row| legacy::Agreement {
                    number: row.get("number"),
                    date_signed: row.get("date_signed"),
                })
            })
    }
}
