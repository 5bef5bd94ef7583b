//! In-memory [`Database`] for tests.
//!
//! Mirrors the transactional behavior of the real storage: [`Transact`]
//! yields a handle over a pending copy of the state, mutations apply to that
//! copy, and only [`Commit`] publishes it back.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use common::operations::{
    Allocate, By, Commit, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;
use uuid::Uuid;

use crate::{
    domain::{
        agreement, application, assessment, disbursement, legacy, offering,
        sequence, student, Agreement, Disbursement,
    },
    read::{
        agreement::{Active, Signed},
        application::Overview,
        assessment::Disbursements,
        disbursement::PriorIssued,
    },
};

use super::{Database, Error};

/// Application row.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Application {
    pub(crate) student_id: student::Id,
    pub(crate) status: application::Status,
    pub(crate) assessment_id: Option<assessment::Id>,
}

/// Assessment row, inlining its offering.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Assessment {
    pub(crate) application_id: application::Id,
    pub(crate) offering: Option<Offering>,
}

/// Offering of an [`Assessment`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Offering {
    pub(crate) intensity: offering::Intensity,
    pub(crate) study_start_date: offering::StudyStartDate,
    pub(crate) study_end_date: offering::StudyEndDate,
}

/// Legacy system record.
#[derive(Clone, Debug)]
pub(crate) struct Legacy {
    pub(crate) student_id: student::Id,
    pub(crate) intensity: offering::Intensity,
    pub(crate) agreement: legacy::Agreement,
}

/// Whole state of a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub(crate) struct State {
    pub(crate) applications: HashMap<application::Id, Application>,
    pub(crate) assessments: HashMap<assessment::Id, Assessment>,
    pub(crate) agreements: HashMap<agreement::Id, Agreement>,
    pub(crate) schedules: HashMap<disbursement::Id, Disbursement>,
    pub(crate) sequences: HashMap<sequence::Group, i64>,
    pub(crate) legacy: Vec<Legacy>,
    pub(crate) locks: Vec<(student::Id, offering::Intensity)>,
}

/// In-memory [`Database`].
#[derive(Clone, Debug, Default)]
pub(crate) struct Memory {
    /// Committed [`State`], shared by all the clones of this [`Memory`].
    committed: Arc<Mutex<State>>,

    /// Pending [`State`] of a transaction in progress, if any.
    pending: Option<Arc<Mutex<State>>>,
}

impl Memory {
    /// Mutates the committed [`State`] directly, bypassing transactions.
    pub(crate) fn seed(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.committed.lock().unwrap());
    }

    /// Returns a copy of the committed [`State`].
    pub(crate) fn snapshot(&self) -> State {
        self.committed.lock().unwrap().clone()
    }

    /// Returns the [`State`] cell reads and writes should go to.
    fn cell(&self) -> &Arc<Mutex<State>> {
        self.pending.as_ref().unwrap_or(&self.committed)
    }

    /// Resolves the (student, intensity) scope of the given [`Disbursement`].
    fn scope_of(
        state: &State,
        schedule: &Disbursement,
    ) -> Option<(student::Id, offering::Intensity)> {
        let assessment = state.assessments.get(&schedule.assessment_id)?;
        let application = state.applications.get(&assessment.application_id)?;
        Some((application.student_id, assessment.offering?.intensity))
    }
}

impl Database<Transact> for Memory {
    type Ok = Self;
    type Err = Traced<Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let pending = self.committed.lock().unwrap().clone();
        Ok(Self {
            committed: Arc::clone(&self.committed),
            pending: Some(Arc::new(Mutex::new(pending))),
        })
    }
}

impl Database<Commit> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        if let Some(pending) = &self.pending {
            *self.committed.lock().unwrap() = pending.lock().unwrap().clone();
        }
        Ok(())
    }
}

impl Database<Lock<By<Agreement, (student::Id, offering::Intensity)>>>
    for Memory
{
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Agreement, (student::Id, offering::Intensity)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let scope = by.into_inner();
        let mut state = self.cell().lock().unwrap();
        if !state.locks.contains(&scope) {
            state.locks.push(scope);
        }
        Ok(())
    }
}

impl Database<Select<By<Option<Overview>, application::Id>>> for Memory {
    type Ok = Option<Overview>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Overview>, application::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let state = self.cell().lock().unwrap();
        Ok(state.applications.get(&id).map(|app| Overview {
            student_id: app.student_id,
            status: app.status,
            assessment_id: app.assessment_id,
            intensity: app
                .assessment_id
                .and_then(|id| state.assessments.get(&id))
                .and_then(|a| a.offering)
                .map(|o| o.intensity),
        }))
    }
}

impl Database<Select<By<Option<Disbursements>, assessment::Id>>> for Memory {
    type Ok = Option<Disbursements>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Disbursements>, assessment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        let state = self.cell().lock().unwrap();
        let Some(assessment) = state.assessments.get(&id) else {
            return Ok(None);
        };
        let Some(application) =
            state.applications.get(&assessment.application_id)
        else {
            return Ok(None);
        };
        let Some(offering) = assessment.offering else {
            return Ok(None);
        };
        let mut schedules = state
            .schedules
            .values()
            .filter(|d| d.assessment_id == id)
            .copied()
            .collect::<Vec<_>>();
        if schedules.is_empty() {
            return Ok(None);
        }
        schedules.sort_by_key(|d| (d.disbursement_date, Uuid::from(d.id)));
        Ok(Some(Disbursements {
            application_id: assessment.application_id,
            student_id: application.student_id,
            intensity: offering.intensity,
            study_start_date: offering.study_start_date,
            study_end_date: offering.study_end_date,
            schedules,
        }))
    }
}

impl Database<Select<By<HashMap<agreement::Id, Agreement>, Vec<agreement::Id>>>>
    for Memory
{
    type Ok = HashMap<agreement::Id, Agreement>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<HashMap<agreement::Id, Agreement>, Vec<agreement::Id>>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        let state = self.cell().lock().unwrap();
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                state.agreements.get(&id).map(|a| (id, a.clone()))
            })
            .collect())
    }
}

impl
    Database<
        Select<
            By<Option<Signed<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    > for Memory
{
    type Ok = Option<Signed<Agreement>>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Signed<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (student_id, intensity) = by.into_inner();
        let state = self.cell().lock().unwrap();
        Ok(state
            .agreements
            .values()
            .filter(|a| {
                a.student_id == student_id
                    && a.intensity == intensity
                    && a.is_signed()
                    && a.is_active()
            })
            .max_by_key(|a| a.created_at)
            .cloned()
            .map(Signed))
    }
}

impl
    Database<
        Select<
            By<Option<Active<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    > for Memory
{
    type Ok = Option<Active<Agreement>>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<Active<Agreement>>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (student_id, intensity) = by.into_inner();
        let state = self.cell().lock().unwrap();
        Ok(state
            .agreements
            .values()
            .filter(|a| {
                a.student_id == student_id
                    && a.intensity == intensity
                    && a.is_active()
            })
            .max_by_key(|a| a.created_at)
            .cloned()
            .map(Active))
    }
}

impl
    Database<
        Select<By<Option<PriorIssued>, (student::Id, offering::Intensity)>>,
    > for Memory
{
    type Ok = Option<PriorIssued>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<PriorIssued>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let scope = by.into_inner();
        let state = self.cell().lock().unwrap();
        Ok(state
            .schedules
            .values()
            .filter(|d| {
                matches!(
                    d.status,
                    disbursement::Status::ReadyToSend
                        | disbursement::Status::Sent,
                ) && d.agreement_id.is_some()
                    && Memory::scope_of(&state, d) == Some(scope)
            })
            .max_by_key(|d| d.disbursement_date)
            .and_then(|d| {
                let agreement =
                    state.agreements.get(&d.agreement_id?)?.clone();
                let study_end_date = state
                    .assessments
                    .get(&d.assessment_id)?
                    .offering?
                    .study_end_date;
                Some(PriorIssued {
                    agreement,
                    study_end_date,
                })
            }))
    }
}

impl
    Database<
        Select<
            By<Option<legacy::Agreement>, (student::Id, offering::Intensity)>,
        >,
    > for Memory
{
    type Ok = Option<legacy::Agreement>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Option<legacy::Agreement>, (student::Id, offering::Intensity)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let (student_id, intensity) = by.into_inner();
        let state = self.cell().lock().unwrap();
        Ok(state
            .legacy
            .iter()
            .find(|l| l.student_id == student_id && l.intensity == intensity)
            .map(|l| l.agreement.clone()))
    }
}

impl Database<Insert<Agreement>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(agreement): Insert<Agreement>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.cell().lock().unwrap();
        _ = state.agreements.insert(agreement.id, agreement);
        Ok(())
    }
}

impl Database<Update<agreement::Supersession>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(supersession): Update<agreement::Supersession>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.cell().lock().unwrap();
        for a in state.agreements.values_mut().filter(|a| {
            a.student_id == supersession.student_id
                && a.intensity == supersession.intensity
                && !a.is_signed()
                && a.is_active()
        }) {
            a.cancelled_date = Some(supersession.cancelled_date);
            a.updated_at = Some(supersession.modified_at);
            a.modifier_id = Some(supersession.modifier_id);
        }
        Ok(())
    }
}

impl Database<Update<disbursement::Reassignment>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(reassignment): Update<disbursement::Reassignment>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.cell().lock().unwrap();
        let scope = (reassignment.student_id, reassignment.intensity);
        let State {
            assessments,
            applications,
            schedules,
            ..
        } = &mut *state;
        for d in schedules.values_mut().filter(|d| {
            d.status == disbursement::Status::Pending
                && assessments.get(&d.assessment_id).is_some_and(|a| {
                    a.offering.map(|o| o.intensity) == Some(scope.1)
                        && applications
                            .get(&a.application_id)
                            .is_some_and(|app| app.student_id == scope.0)
                })
        }) {
            d.agreement_id = Some(reassignment.agreement_id);
        }
        Ok(())
    }
}

impl Database<Update<disbursement::Association>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(association): Update<disbursement::Association>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.cell().lock().unwrap();
        for d in state
            .schedules
            .values_mut()
            .filter(|d| d.assessment_id == association.assessment_id)
        {
            d.agreement_id = Some(association.agreement_id);
        }
        Ok(())
    }
}

impl Database<Allocate<By<sequence::Number, sequence::Group>>> for Memory {
    type Ok = sequence::Number;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Allocate(by): Allocate<By<sequence::Number, sequence::Group>>,
    ) -> Result<Self::Ok, Self::Err> {
        let group = by.into_inner();
        let mut state = self.cell().lock().unwrap();
        let value = state.sequences.entry(group).or_insert(0);
        *value += 1;
        Ok(sequence::Number::from(*value))
    }
}
