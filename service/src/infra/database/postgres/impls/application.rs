use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::application,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::application::Overview,
};

impl<C> Database<Select<By<Option<Overview>, application::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Overview>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Overview>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: application::Id = by.into_inner();

        const SQL: &str = "\
            SELECT a.student_id, a.status, \
                   a.current_assessment_id, \
                   o.intensity \
            FROM applications AS a \
            LEFT JOIN student_assessments AS sa \
                   ON sa.id = a.current_assessment_id \
            LEFT JOIN offerings AS o \
                   ON o.id = sa.offering_id \
            WHERE a.id = $1::UUID";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| {
                row.map(|row| Overview {
                    student_id: row.get("student_id"),
                    status: row.get("status"),
                    assessment_id: row.get("current_assessment_id"),
                    intensity: row.get("intensity"),
                })
            })
    }
}
