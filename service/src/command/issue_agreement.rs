//! Routine issuing a new [`Agreement`], shared by [`Command`]s.
//!
//! [`Command`]: super::Command

use common::{
    operations::{Allocate, By, Insert, Update},
    DateTime,
};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        actor, agreement, application, disbursement, offering, sequence,
        student, Agreement,
    },
    infra::{database, Database},
};

/// Arguments of the [`execute()`] routine.
#[derive(Clone, Copy, Debug)]
pub(crate) struct IssueAgreement {
    /// ID of the student the new [`Agreement`] is issued for.
    pub(crate) student_id: student::Id,

    /// [`offering::Intensity`] the new [`Agreement`] is scoped to.
    pub(crate) intensity: offering::Intensity,

    /// ID of the application recorded as the reason of the issuing.
    pub(crate) reference_application_id: application::Id,

    /// ID of the actor the issuing is attributed to.
    pub(crate) actor_id: actor::Id,
}

/// Issues a new [`Agreement`] on the given `tx` transaction.
///
/// Supersedes every unsigned active [`Agreement`] of the same
/// (student, intensity) scope, allocates the next [`agreement::Number`] from
/// the scope's [`sequence::Group`], persists the new [`Agreement`] as
/// unsigned and active, and repoints the scope's still pending disbursements
/// onto it.
///
/// The caller is expected to hold the scope's lock already.
pub(crate) async fn execute<Tx>(
    tx: &Tx,
    args: IssueAgreement,
) -> Result<Agreement, Traced<database::Error>>
where
    Tx: Database<
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
        >,
{
    let IssueAgreement {
        student_id,
        intensity,
        reference_application_id,
        actor_id,
    } = args;

    let now = DateTime::now();

    tx.execute(Update(agreement::Supersession {
        student_id,
        intensity,
        cancelled_date: now.date(),
        modified_at: now.coerce(),
        modifier_id: actor_id,
    }))
    .await
    .map_err(tracerr::wrap!())
    .map(drop)?;

    let number = tx
        .execute(Allocate(By::<sequence::Number, _>::new(
            sequence::Group::from(intensity),
        )))
        .await
        .map_err(tracerr::wrap!())?;

    let agreement = Agreement {
        id: agreement::Id::new(),
        number: number.into(),
        student_id,
        intensity,
        reference_application_id,
        date_signed: None,
        cancelled_date: None,
        created_at: now.coerce(),
        updated_at: None,
        creator_id: actor_id,
        modifier_id: None,
    };

    tx.execute(Insert(agreement.clone()))
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

    tx.execute(Update(disbursement::Reassignment {
        student_id,
        intensity,
        agreement_id: agreement.id,
    }))
    .await
    .map_err(tracerr::wrap!())
    .map(drop)?;

    log::debug!(
        "issued `Agreement(id: {}, number: {})` for `Student(id: \
         {student_id})`",
        agreement.id,
        agreement.number,
    );

    Ok(agreement)
}
