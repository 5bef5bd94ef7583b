//! [`Command`] for associating an [`Agreement`] with an assessment's
//! disbursements.

use common::{
    operations::{
        Allocate, By, Commit, Insert, Lock, Select, Transact, Transacted,
        Update,
    },
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        actor, agreement, assessment, disbursement, legacy, offering,
        sequence, student, Agreement,
    },
    infra::{database, Database},
    read::{
        agreement::{Active, Signed},
        assessment::Disbursements,
        disbursement::PriorIssued,
    },
    Service,
};

use super::{issue_agreement, Command};

/// [`Command`] for associating an [`Agreement`] with every disbursement of an
/// assessment.
///
/// The [`Agreement`] to use is resolved by a decision cascade: a signed
/// active one of the (student, intensity) scope, then the one backing the
/// scope's most recent sent disbursement when its study period is still
/// within the validity window, then an import from the legacy system, then
/// any still active one, and, when nothing qualifies, a newly issued one.
///
/// Expected to run exactly once per assessment.
#[derive(Clone, Copy, Debug)]
pub struct AssociateAgreement {
    /// ID of the assessment whose disbursements are associated.
    pub assessment_id: assessment::Id,

    /// ID of the actor the association is attributed to.
    pub actor_id: actor::Id,
}

impl<Db> Command<AssociateAgreement> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<Disbursements>, assessment::Id>>,
            Ok = Option<Disbursements>,
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
            Select<
                By<
                    Option<Signed<Agreement>>,
                    (student::Id, offering::Intensity),
                >,
            >,
            Ok = Option<Signed<Agreement>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<PriorIssued>, (student::Id, offering::Intensity)>>,
            Ok = Option<PriorIssued>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    Option<legacy::Agreement>,
                    (student::Id, offering::Intensity),
                >,
            >,
            Ok = Option<legacy::Agreement>,
            Err = Traced<database::Error>,
        > + Database<
            Select<
                By<
                    Option<Active<Agreement>>,
                    (student::Id, offering::Intensity),
                >,
            >,
            Ok = Option<Active<Agreement>>,
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
        > + Database<
            Update<disbursement::Association>,
            Err = Traced<database::Error>,
        > + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Agreement;
    type Err = Traced<ExecutionError>;

    #[expect(clippy::too_many_lines, reason = "still readable")]
    async fn execute(
        &self,
        cmd: AssociateAgreement,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssociateAgreement {
            assessment_id,
            actor_id,
        } = cmd;

        let view = self
            .database()
            .execute(Select(By::<Option<Disbursements>, _>::new(assessment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AssessmentNotExists(assessment_id))
            .map_err(tracerr::wrap!())?;
        if view.schedules.first().and_then(|d| d.agreement_id).is_some() {
            return Err(tracerr::new!(E::AlreadyAssociated(assessment_id)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent agreement issuing upon the same student and
        // intensity.
        tx.execute(Lock(By::<Agreement, _>::new((
            view.student_id,
            view.intensity,
        ))))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        let view = tx
            .execute(Select(By::<Option<Disbursements>, _>::new(assessment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::AssessmentNotExists(assessment_id))
            .map_err(tracerr::wrap!())?;
        if view.schedules.first().and_then(|d| d.agreement_id).is_some() {
            return Err(tracerr::new!(E::AlreadyAssociated(assessment_id)));
        }

        let scope = (view.student_id, view.intensity);
        let mut resolved = None;

        // Signed active agreement of the scope.
        if let Some(Signed(agreement)) = tx
            .execute(Select(By::<Option<Signed<Agreement>>, _>::new(scope)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            log::debug!(
                "reusing signed `Agreement(id: {})` for `Assessment(id: \
                 {assessment_id})`",
                agreement.id,
            );
            resolved = Some(agreement);
        }

        // Agreement the scope's most recent sent disbursement was paid
        // under, when its study period is still within the validity window.
        if resolved.is_none() {
            resolved = tx
                .execute(Select(By::<Option<PriorIssued>, _>::new(scope)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|prior| {
                    prior.agreement.is_signed()
                        && prior.agreement.is_active()
                        && prior.is_within_validity_window(
                            view.study_start_date,
                        )
                })
                .map(|prior| {
                    log::debug!(
                        "reusing prior `Agreement(id: {})` for \
                         `Assessment(id: {assessment_id})`",
                        prior.agreement.id,
                    );
                    prior.agreement
                });
        }

        // Signed agreement imported from the legacy system.
        if resolved.is_none() {
            if let Some(imported) = tx
                .execute(Select(By::<Option<legacy::Agreement>, _>::new(
                    scope,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
            {
                let agreement = Agreement {
                    id: agreement::Id::new(),
                    number: imported.number,
                    student_id: view.student_id,
                    intensity: view.intensity,
                    reference_application_id: view.application_id,
                    date_signed: Some(imported.date_signed),
                    cancelled_date: None,
                    created_at: DateTime::now().coerce(),
                    updated_at: None,
                    creator_id: actor_id,
                    modifier_id: None,
                };
                tx.execute(Insert(agreement.clone()))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))
                    .map(drop)?;
                log::debug!(
                    "imported legacy `Agreement(number: {})` for \
                     `Assessment(id: {assessment_id})`",
                    agreement.number,
                );
                resolved = Some(agreement);
            }
        }

        // Any active agreement of the scope, even unsigned.
        if resolved.is_none() {
            resolved = tx
                .execute(Select(By::<Option<Active<Agreement>>, _>::new(
                    scope,
                )))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .map(|Active(agreement)| {
                    log::debug!(
                        "reusing active `Agreement(id: {})` for \
                         `Assessment(id: {assessment_id})`",
                        agreement.id,
                    );
                    agreement
                });
        }

        let agreement = if let Some(agreement) = resolved {
            agreement
        } else {
            issue_agreement::execute(
                &tx,
                issue_agreement::IssueAgreement {
                    student_id: view.student_id,
                    intensity: view.intensity,
                    reference_application_id: view.application_id,
                    actor_id,
                },
            )
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        };

        tx.execute(Update(disbursement::Association {
            assessment_id,
            agreement_id: agreement.id,
        }))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(agreement)
    }
}

/// Error of [`AssociateAgreement`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Assessment's disbursements are already associated with an agreement.
    #[display(
        "`Assessment(id: {_0})` disbursements are already associated with an \
         agreement"
    )]
    AlreadyAssociated(#[error(not(source))] assessment::Id),

    /// Assessment with the provided ID has no disbursements to associate.
    #[display("`Assessment(id: {_0})` does not exist")]
    AssessmentNotExists(#[error(not(source))] assessment::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),
}
