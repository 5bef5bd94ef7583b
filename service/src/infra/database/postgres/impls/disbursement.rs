//! [`Disbursement`]-related [`Database`] implementations.
//!
//! [`Disbursement`]: crate::domain::Disbursement

use std::collections::HashMap;

use common::operations::{By, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{agreement, disbursement, offering, student, Agreement},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::disbursement::PriorIssued,
};

impl<C>
    Database<
        Select<By<Option<PriorIssued>, (student::Id, offering::Intensity)>>,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<agreement::Id, Agreement>, [agreement::Id; 1]>>,
        Ok = HashMap<agreement::Id, Agreement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<PriorIssued>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<PriorIssued>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let (student_id, intensity): (student::Id, offering::Intensity) =
            by.into_inner();

        const SQL: &str = "\
            SELECT d.agreement_id, o.study_end_date \
            FROM disbursement_schedules AS d \
            JOIN student_assessments AS sa \
              ON sa.id = d.student_assessment_id \
            JOIN applications AS a \
              ON a.id = sa.application_id \
            JOIN offerings AS o \
              ON o.id = sa.offering_id \
            WHERE a.student_id = $1::UUID \
              AND o.intensity = $2::INT2 \
              AND d.status IN (SELECT unnest($3::INT2[]) LIMIT $4::INT4) \
              AND d.agreement_id IS NOT NULL \
            ORDER BY d.disbursement_date DESC \
            LIMIT 1";
        let Some(row) = self
            .query_opt(
                SQL,
                &[
                    &student_id,
                    &intensity,
                    &[
                        disbursement::Status::ReadyToSend,
                        disbursement::Status::Sent,
                    ]
                    .as_slice(),
                    &2i32,
                ],
            )
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let id: agreement::Id = row.get("agreement_id");
        let study_end_date = row.get("study_end_date");
        self.execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())
            .map(|mut agreements| {
                agreements.remove(&id).map(|agreement| PriorIssued {
                    agreement,
                    study_end_date,
                })
            })
    }
}

impl<C> Database<Update<disbursement::Reassignment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reassignment): Update<disbursement::Reassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        let disbursement::Reassignment {
            student_id,
            intensity,
            agreement_id,
        } = reassignment;

        const SQL: &str = "\
            UPDATE disbursement_schedules AS d \
            SET agreement_id = $3::UUID \
            FROM student_assessments AS sa \
            JOIN applications AS a \
              ON a.id = sa.application_id \
            JOIN offerings AS o \
              ON o.id = sa.offering_id \
            WHERE sa.id = d.student_assessment_id \
              AND a.student_id = $1::UUID \
              AND o.intensity = $2::INT2 \
              AND d.status = $4::INT2";
        self.exec(
            SQL,
            &[
                &student_id,
                &intensity,
                &agreement_id,
                &disbursement::Status::Pending,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<disbursement::Association>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(association): Update<disbursement::Association>,
    ) -> Result<Self::Ok, Self::Err> {
        let disbursement::Association {
            assessment_id,
            agreement_id,
        } = association;

        const SQL: &str = "\
            UPDATE disbursement_schedules \
            SET agreement_id = $2::UUID \
            WHERE student_assessment_id = $1::UUID";
        self.exec(SQL, &[&assessment_id, &agreement_id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
