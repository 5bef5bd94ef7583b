//! [`Agreement`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::operations::{By, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{agreement, offering, student, Agreement},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::agreement::{Active, Signed},
};

impl<C, IDs> Database<Select<By<HashMap<agreement::Id, Agreement>, IDs>>>
    for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[agreement::Id]>,
{
    type Ok = HashMap<agreement::Id, Agreement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<agreement::Id, Agreement>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[agreement::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let limit = i32::try_from(ids.len()).unwrap();

        const SQL: &str = "\
            SELECT id, number, \
                   student_id, intensity, reference_application_id, \
                   date_signed, cancelled_date, \
                   created_at, updated_at, \
                   creator_id, modifier_id \
            FROM agreements \
            WHERE id IN (SELECT unnest($1::UUID[]) LIMIT $2::INT4) \
            LIMIT $2::INT4";
        Ok(self
            .query(SQL, &[&ids, &limit])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                let agreement = Agreement {
                    id,
                    number: row.get("number"),
                    student_id: row.get("student_id"),
                    intensity: row.get("intensity"),
                    reference_application_id: row
                        .get("reference_application_id"),
                    date_signed: row.get("date_signed"),
                    cancelled_date: row.get("cancelled_date"),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                    creator_id: row.get("creator_id"),
                    modifier_id: row.get("modifier_id"),
                };
                (id, agreement)
            })
            .collect())
    }
}

impl<C>
    Database<
        Select<
            By<Option<Signed<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<agreement::Id, Agreement>, [agreement::Id; 1]>>,
        Ok = HashMap<agreement::Id, Agreement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Signed<Agreement>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Signed<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let (student_id, intensity): (student::Id, offering::Intensity) =
            by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM agreements \
            WHERE student_id = $1::UUID \
              AND intensity = $2::INT2 \
              AND date_signed IS NOT NULL \
              AND cancelled_date IS NULL \
            ORDER BY created_at DESC \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&student_id, &intensity])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let id: agreement::Id = row.get("id");
        self.execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())
            .map(|mut agreements| agreements.remove(&id).map(Signed))
    }
}

impl<C>
    Database<
        Select<
            By<Option<Active<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    > for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<agreement::Id, Agreement>, [agreement::Id; 1]>>,
        Ok = HashMap<agreement::Id, Agreement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<Active<Agreement>>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Active<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let (student_id, intensity): (student::Id, offering::Intensity) =
            by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM agreements \
            WHERE student_id = $1::UUID \
              AND intensity = $2::INT2 \
              AND cancelled_date IS NULL \
            ORDER BY created_at DESC \
            LIMIT 1";
        let Some(row) = self
            .query_opt(SQL, &[&student_id, &intensity])
            .await
            .map_err(tracerr::wrap!())?
        else {
            return Ok(None);
        };

        let id: agreement::Id = row.get("id");
        self.execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())
            .map(|mut agreements| agreements.remove(&id).map(Active))
    }
}

impl<C> Database<Insert<Agreement>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(agreement): Insert<Agreement>,
    ) -> Result<Self::Ok, Self::Err> {
        let Agreement {
            id,
            number,
            student_id,
            intensity,
            reference_application_id,
            date_signed,
            cancelled_date,
            created_at,
            updated_at,
            creator_id,
            modifier_id,
        } = agreement;

        const SQL: &str = "\
            INSERT INTO agreements (\
                id, number, \
                student_id, intensity, reference_application_id, \
                date_signed, cancelled_date, \
                created_at, updated_at, \
                creator_id, modifier_id\
            ) VALUES (\
                $1::UUID, $2::VARCHAR, \
                $3::UUID, $4::INT2, $5::UUID, \
                $6::DATE, $7::DATE, \
                $8::TIMESTAMPTZ, $9::TIMESTAMPTZ, \
                $10::UUID, $11::UUID\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &number,
                &student_id,
                &intensity,
                &reference_application_id,
                &date_signed,
                &cancelled_date,
                &created_at,
                &updated_at,
                &creator_id,
                &modifier_id,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<agreement::Supersession>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(supersession): Update<agreement::Supersession>,
    ) -> Result<Self::Ok, Self::Err> {
        let agreement::Supersession {
            student_id,
            intensity,
            cancelled_date,
            modified_at,
            modifier_id,
        } = supersession;

        const SQL: &str = "\
            UPDATE agreements \
            SET cancelled_date = $3::DATE, \
                updated_at = $4::TIMESTAMPTZ, \
                modifier_id = $5::UUID \
            WHERE student_id = $1::UUID \
              AND intensity = $2::INT2 \
              AND date_signed IS NULL \
              AND cancelled_date IS NULL";
        self.exec(
            SQL,
            &[
                &student_id,
                &intensity,
                &cancelled_date,
                &modified_at,
                &modifier_id,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Agreement, (student::Id, offering::Intensity)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Agreement, (student::Id, offering::Intensity)>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let (student_id, intensity): (student::Id, offering::Intensity) =
            by.into_inner();

        const SQL: &str = "\
            INSERT INTO agreements_lock \
            VALUES ($1::UUID, $2::INT2) \
            ON CONFLICT (student_id, intensity) DO NOTHING";
        self.query(SQL, &[&student_id, &intensity])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
