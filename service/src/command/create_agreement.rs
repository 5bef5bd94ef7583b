//! [`Command`] for creating a new [`Agreement`] upon an application.

use common::operations::{
    Allocate, By, Commit, Insert, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        actor, agreement, application, disbursement, offering, sequence,
        student, Agreement,
    },
    infra::{database, Database},
    read::application::Overview,
    Service,
};

use super::{issue_agreement, Command};

/// [`Command`] for creating a new [`Agreement`] upon an application.
///
/// Any unsigned active [`Agreement`] of the same (student, intensity) scope
/// is superseded by the created one, and the scope's pending disbursements
/// are repointed onto it.
#[derive(Clone, Copy, Debug)]
pub struct CreateAgreement {
    /// ID of the application the [`Agreement`] is created upon.
    pub reference_application_id: application::Id,

    /// ID of the actor who creates the [`Agreement`].
    pub actor_id: actor::Id,
}

impl<Db> Command<CreateAgreement> for Service<Db>
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
        cmd: CreateAgreement,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateAgreement {
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
        let Some(intensity) = overview.intensity else {
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

/// Error of [`CreateAgreement`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
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

    /// Application has no current assessment with an offering to derive the
    /// intensity from.
    #[display("`Application(id: {_0})` has no offering assessed")]
    OfferingNotSet(#[error(not(source))] application::Id),
}
