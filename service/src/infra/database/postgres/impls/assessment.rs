use common::operations::{By, Select};
use tracerr::Traced;

use crate::{
    domain::{assessment, Disbursement},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::assessment::Disbursements,
};

impl<C> Database<Select<By<Option<Disbursements>, assessment::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Disbursements>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Disbursements>, assessment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: assessment::Id = by.into_inner();

        const SQL: &str = "\
            SELECT sa.application_id, a.student_id, \
                   o.intensity, o.study_start_date, o.study_end_date, \
                   d.id, d.status, d.agreement_id, d.disbursement_date \
            FROM student_assessments AS sa \
            JOIN applications AS a \
              ON a.id = sa.application_id \
            JOIN offerings AS o \
              ON o.id = sa.offering_id \
            JOIN disbursement_schedules AS d \
              ON d.student_assessment_id = sa.id \
            WHERE sa.id = $1::UUID \
            ORDER BY d.disbursement_date ASC, d.id ASC";
        let rows = self.query(SQL, &[&id]).await.map_err(tracerr::wrap!())?;
        let Some(first) = rows.first() else {
            return Ok(None);
        };

        Ok(Some(Disbursements {
            application_id: first.get("application_id"),
            student_id: first.get("student_id"),
            intensity: first.get("intensity"),
            study_start_date: first.get("study_start_date"),
            study_end_date: first.get("study_end_date"),
            schedules: rows
                .iter()
                .map(|row| Disbursement {
                    id: row.get("id"),
                    assessment_id: id,
                    status: row.get("status"),
                    agreement_id: row.get("agreement_id"),
                    disbursement_date: row.get("disbursement_date"),
                })
                .collect(),
        }))
    }
}
