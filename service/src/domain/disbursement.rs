//! [`Disbursement`] definitions.

use common::{define_kind, DateOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{agreement, assessment, offering, student};

/// Single scheduled payment of a student financial aid assessment.
#[derive(Clone, Copy, Debug)]
pub struct Disbursement {
    /// ID of this [`Disbursement`].
    pub id: Id,

    /// ID of the assessment this [`Disbursement`] was scheduled by.
    pub assessment_id: assessment::Id,

    /// [`Status`] of this [`Disbursement`].
    pub status: Status,

    /// ID of the [`Agreement`] backing this [`Disbursement`], if any.
    ///
    /// Unset until the [`Disbursement`] is associated with one, and repointed
    /// whenever a new [`Agreement`] supersedes it while this [`Disbursement`]
    /// is still [`Status::Pending`].
    ///
    /// [`Agreement`]: agreement::Agreement
    pub agreement_id: Option<agreement::Id>,

    /// [`Date`] this [`Disbursement`] is scheduled to be paid at.
    ///
    /// [`Date`]: common::Date
    pub disbursement_date: PaymentDate,
}

/// ID of a [`Disbursement`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Status of a [`Disbursement`] in its payment pipeline."]
    enum Status {
        #[doc = "Scheduled, but not picked for sending yet. The only \
                 [`Status`] allowing the backing agreement to change."]
        Pending = 1,

        #[doc = "Picked to be sent to the payment system."]
        ReadyToSend = 2,

        #[doc = "Sent to the payment system."]
        Sent = 3,

        #[doc = "Cancelled and won't ever be paid."]
        Cancelled = 4,
    }
}

/// Repointing of every [`Status::Pending`] [`Disbursement`] within a
/// (student, intensity) scope onto another agreement.
///
/// Disbursements already sent (or picked for sending) keep the agreement they
/// were paid under.
#[derive(Clone, Copy, Debug)]
pub struct Reassignment {
    /// ID of the student whose [`Disbursement`]s are repointed.
    pub student_id: student::Id,

    /// [`offering::Intensity`] scoping the repointed [`Disbursement`]s.
    pub intensity: offering::Intensity,

    /// ID of the agreement the [`Disbursement`]s are repointed onto.
    pub agreement_id: agreement::Id,
}

/// Association of every [`Disbursement`] of a single assessment with an
/// agreement.
#[derive(Clone, Copy, Debug)]
pub struct Association {
    /// ID of the assessment whose [`Disbursement`]s are associated.
    pub assessment_id: assessment::Id,

    /// ID of the agreement the [`Disbursement`]s are associated with.
    pub agreement_id: agreement::Id,
}

/// [`Date`] a [`Disbursement`] is scheduled to be paid at.
///
/// [`Date`]: common::Date
pub type PaymentDate = DateOf<Disbursement>;
