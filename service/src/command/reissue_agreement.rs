//! [`Command`] for reissuing a cancelled [`Agreement`].

use std::collections::HashMap;

use common::operations::{
    Allocate, By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        actor, agreement, application, assessment, disbursement, offering,
        sequence, student, Agreement,
    },
    infra::{database, Database},
    read::{application::Overview, assessment::Disbursements},
    Service,
};

use super::{issue_agreement, Command};

/// [`Command`] for reissuing a cancelled [`Agreement`].
///
/// Issues a new [`Agreement`] replacing the cancelled one backing the
/// application's pending disbursements, so the student may sign again and the
/// payments may proceed.
#[derive(Clone, Copy, Debug)]
pub struct ReissueAgreement {
    /// ID of the application the [`Agreement`] is reissued upon.
    pub reference_application_id: application::Id,

    /// ID of the actor who reissues the [`Agreement`].
    pub actor_id: actor::Id,
}

impl<Db> Command<ReissueAgreement> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Overview>, application::Id>>,
            Ok = Option<Overview>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Agreement, (student::Id, offering::Intensity)>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Disbursements>, assessment::Id>>,
            Ok = Option<Disbursements>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<HashMap<agreement::Id, Agreement>, Vec<agreement::Id>>>,
            Ok = HashMap<agreement::Id, Agreement>,
            Err = Traced<database::Error>,
        > + Database<
            Update<agreement::Supersession>,
            Err = Traced<database::Error>,
        > + Database<
            Allocate<By<sequence::Number, sequence::Group>>,
            Ok = sequence::Number,
            Err = Traced<database::Error>,
        > + Database<Insert<Agreement>, Err = Traced<database::Error>>
        + Database<
            Update<disbursement::Reassignment>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Agreement;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ReissueAgreement,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ReissueAgreement {
            reference_application_id,
            actor_id,
        } = cmd;

        let overview = self
            .database()
            .execute(Select(By::<Option<Overview>, _>::new(
                reference_application_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ApplicationNotExists(reference_application_id))
            .map_err(tracerr::wrap!())?;

        if !overview.status.allows_agreement_issuing() {
            return Err(tracerr::new!(E::InvalidApplicationState(
                overview.status,
            )));
        }
        let (Some(assessment_id), Some(intensity)) =
            (overview.assessment_id, overview.intensity)
        else {
            return Err(tracerr::new!(E::OfferingNotSet(
                reference_application_id,
            )));
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent agreement issuing upon the same student and
        // intensity.
        tx.execute(Lock(By::<Agreement, _>::new((
            overview.student_id,
            intensity,
        ))))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let schedules = tx
            .execute(Select(By::<Option<Disbursements>, _>::new(assessment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .map(|view| view.schedules)
            .unwrap_or_default();
        let pending_agreements = schedules
            .iter()
            .filter(|d| d.status == disbursement::Status::Pending)
            .map(|d| d.agreement_id)
            .collect::<Vec<_>>();
        if pending_agreements.is_empty() {
            return Err(tracerr::new!(E::NoPendingDisbursement(
                reference_application_id,
            )));
        }

        let agreements = tx
            .execute(Select(By::<HashMap<agreement::Id, Agreement>, _>::new(
                pending_agreements.into_iter().flatten().collect::<Vec<_>>(),
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if agreements.values().all(Agreement::is_active) {
            return Err(tracerr::new!(E::AgreementNotCancelled(
                reference_application_id,
            )));
        }

        let agreement = issue_agreement::execute(
            &tx,
            issue_agreement::IssueAgreement {
                student_id: overview.student_id,
                intensity,
                reference_application_id,
                actor_id,
            },
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(agreement)
    }
}

/// Error of [`ReissueAgreement`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// None of the application's pending disbursements is backed by a
    /// cancelled agreement.
    #[display("`Application(id: {_0})` has no cancelled agreement to reissue")]
    AgreementNotCancelled(#[error(not(source))] application::Id),

    /// Application with the provided ID does not exist.
    #[display("`Application(id: {_0})` does not exist")]
    ApplicationNotExists(#[error(not(source))] application::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Application is in a status disallowing agreement issuing.
    #[display("`Application` in `{_0}` status cannot have agreements issued")]
    InvalidApplicationState(#[error(not(source))] application::Status),

    /// Application's current assessment has no disbursements awaiting
    /// payment.
    #[display("`Application(id: {_0})` has no pending disbursements")]
    NoPendingDisbursement(#[error(not(source))] application::Id),

    /// Application has no current assessment with an offering to derive the
    /// intensity from.
    #[display("`Application(id: {_0})` has no offering assessed")]
    OfferingNotSet(#[error(not(source))] application::Id),
}

#[cfg(test)]
mod spec {
    use common::Date;

    use crate::{
        domain::{
            actor, agreement, application, assessment, disbursement, offering,
            sequence, student, Agreement,
        },
        infra::database::memory::{self, Memory},
        Service,
    };

    use super::{Command as _, ExecutionError as E, ReissueAgreement};

    fn date(year: i32, month: u8, day: u8) -> Date {
        Date::from_calendar_date(year, month, day).unwrap()
    }

    /// Seeds an application of the given `student_id` in [`Completed`]
    /// status, assessed with an offering of the given `intensity`.
    ///
    /// [`Completed`]: application::Status::Completed
    fn seed_application(
        db: &Memory,
        student_id: student::Id,
        intensity: offering::Intensity,
    ) -> (application::Id, assessment::Id) {
        let application_id = application::Id::new();
        let assessment_id = assessment::Id::new();
        db.seed(|state| {
            _ = state.applications.insert(
                application_id,
                memory::Application {
                    student_id,
                    status: application::Status::Completed,
                    assessment_id: Some(assessment_id),
                },
            );
            _ = state.assessments.insert(
                assessment_id,
                memory::Assessment {
                    application_id,
                    offering: Some(memory::Offering {
                        intensity,
                        study_start_date: date(2024, 9, 1).coerce(),
                        study_end_date: date(2025, 6, 30).coerce(),
                    }),
                },
            );
        });
        (application_id, assessment_id)
    }

    /// Seeds an agreement of the given signing/cancellation state.
    fn seed_agreement(
        db: &Memory,
        student_id: student::Id,
        intensity: offering::Intensity,
        reference_application_id: application::Id,
        signed: bool,
        cancelled: bool,
    ) -> agreement::Id {
        let id = agreement::Id::new();
        db.seed(|state| {
            _ = state.agreements.insert(
                id,
                Agreement {
                    id,
                    number: sequence::Number::from(1).into(),
                    student_id,
                    intensity,
                    reference_application_id,
                    date_signed: signed.then(|| date(2024, 2, 15).coerce()),
                    cancelled_date: cancelled
                        .then(|| date(2024, 5, 1).coerce()),
                    created_at: common::DateTime::now().coerce(),
                    updated_at: None,
                    creator_id: actor::Id::new(),
                    modifier_id: None,
                },
            );
        });
        id
    }

    /// Seeds a disbursement schedule of the given assessment.
    fn seed_schedule(
        db: &Memory,
        assessment_id: assessment::Id,
        status: disbursement::Status,
        agreement_id: Option<agreement::Id>,
    ) -> disbursement::Id {
        let id = disbursement::Id::new();
        db.seed(|state| {
            _ = state.schedules.insert(
                id,
                disbursement::Disbursement {
                    id,
                    assessment_id,
                    status,
                    agreement_id,
                    disbursement_date: date(2024, 10, 1).coerce(),
                },
            );
        });
        id
    }

    #[tokio::test]
    async fn reissues_upon_cancelled_agreement() {
        let db = Memory::default();
        let student_id = student::Id::new();
        let (application_id, assessment_id) = seed_application(
            &db,
            student_id,
            offering::Intensity::FullTime,
        );
        let old_id = seed_agreement(
            &db,
            student_id,
            offering::Intensity::FullTime,
            application_id,
            true,
            true,
        );
        let sent = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Sent,
            Some(old_id),
        );
        let pending = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Pending,
            Some(old_id),
        );

        let agreement = Service::new(db.clone())
            .execute(ReissueAgreement {
                reference_application_id: application_id,
                actor_id: actor::Id::new(),
            })
            .await
            .unwrap();

        assert!(!agreement.is_signed());
        assert!(agreement.is_active());
        let state = db.snapshot();
        assert!(!state.agreements[&old_id].is_active());
        assert_eq!(state.schedules[&sent].agreement_id, Some(old_id));
        assert_eq!(
            state.schedules[&pending].agreement_id,
            Some(agreement.id),
        );
    }

    #[tokio::test]
    async fn reassigns_pending_disbursements_across_applications() {
        let db = Memory::default();
        let student_id = student::Id::new();
        let (application_id, assessment_id) = seed_application(
            &db,
            student_id,
            offering::Intensity::FullTime,
        );
        let (_, other_assessment_id) = seed_application(
            &db,
            student_id,
            offering::Intensity::FullTime,
        );
        let (part_time_application_id, part_time_assessment_id) =
            seed_application(&db, student_id, offering::Intensity::PartTime);
        let full_time_id = seed_agreement(
            &db,
            student_id,
            offering::Intensity::FullTime,
            application_id,
            true,
            true,
        );
        let part_time_id = seed_agreement(
            &db,
            student_id,
            offering::Intensity::PartTime,
            part_time_application_id,
            true,
            true,
        );
        let sent = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Sent,
            Some(full_time_id),
        );
        let pending = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Pending,
            Some(full_time_id),
        );
        let other_sent = seed_schedule(
            &db,
            other_assessment_id,
            disbursement::Status::Sent,
            Some(full_time_id),
        );
        let other_pending = seed_schedule(
            &db,
            other_assessment_id,
            disbursement::Status::Pending,
            Some(full_time_id),
        );
        let part_time_pending = seed_schedule(
            &db,
            part_time_assessment_id,
            disbursement::Status::Pending,
            Some(part_time_id),
        );

        let agreement = Service::new(db.clone())
            .execute(ReissueAgreement {
                reference_application_id: application_id,
                actor_id: actor::Id::new(),
            })
            .await
            .unwrap();

        let state = db.snapshot();
        for id in [pending, other_pending] {
            assert_eq!(
                state.schedules[&id].agreement_id,
                Some(agreement.id),
            );
        }
        for id in [sent, other_sent] {
            assert_eq!(
                state.schedules[&id].agreement_id,
                Some(full_time_id),
            );
        }
        assert_eq!(
            state.schedules[&part_time_pending].agreement_id,
            Some(part_time_id),
        );
        assert!(!state.agreements[&part_time_id].is_active());
    }

    #[tokio::test]
    async fn rejects_active_agreement() {
        let db = Memory::default();
        let student_id = student::Id::new();
        let (application_id, assessment_id) = seed_application(
            &db,
            student_id,
            offering::Intensity::FullTime,
        );
        let signed_id = seed_agreement(
            &db,
            student_id,
            offering::Intensity::FullTime,
            application_id,
            true,
            false,
        );
        let pending = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Pending,
            Some(signed_id),
        );

        let err = Service::new(db.clone())
            .execute(ReissueAgreement {
                reference_application_id: application_id,
                actor_id: actor::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            E::AgreementNotCancelled(id) if *id == application_id,
        ));
        let state = db.snapshot();
        assert_eq!(state.agreements.len(), 1);
        assert_eq!(state.schedules[&pending].agreement_id, Some(signed_id));
        assert!(state.sequences.is_empty());
    }

    #[tokio::test]
    async fn rejects_assessment_without_pending_disbursements() {
        let db = Memory::default();
        let student_id = student::Id::new();
        let (application_id, assessment_id) = seed_application(
            &db,
            student_id,
            offering::Intensity::FullTime,
        );
        let old_id = seed_agreement(
            &db,
            student_id,
            offering::Intensity::FullTime,
            application_id,
            true,
            true,
        );
        _ = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Sent,
            Some(old_id),
        );
        _ = seed_schedule(
            &db,
            assessment_id,
            disbursement::Status::Cancelled,
            Some(old_id),
        );

        let err = Service::new(db)
            .execute(ReissueAgreement {
                reference_application_id: application_id,
                actor_id: actor::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            E::NoPendingDisbursement(id) if *id == application_id,
        ));
    }

    #[tokio::test]
    async fn rejects_unknown_application() {
        let db = Memory::default();
        let application_id = application::Id::new();

        let err = Service::new(db)
            .execute(ReissueAgreement {
                reference_application_id: application_id,
                actor_id: actor::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            E::ApplicationNotExists(id) if *id == application_id,
        ));
    }

    #[tokio::test]
    async fn rejects_application_in_disallowed_status() {
        let db = Memory::default();
        let application_id = application::Id::new();
        db.seed(|state| {
            _ = state.applications.insert(
                application_id,
                memory::Application {
                    student_id: student::Id::new(),
                    status: application::Status::Draft,
                    assessment_id: None,
                },
            );
        });

        let err = Service::new(db)
            .execute(ReissueAgreement {
                reference_application_id: application_id,
                actor_id: actor::Id::new(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            E::InvalidApplicationState(s)
                if *s == application::Status::Draft,
        ));
    }
}
