//! Student aid application definitions.

use common::define_kind;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// ID of a student aid application.
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
    #[doc = "Lifecycle status of a student aid application."]
    enum Status {
        #[doc = "Application is being filled in by the student."]
        Draft = 1,

        #[doc = "Application is submitted and awaits processing."]
        Submitted = 2,

        #[doc = "Application is being processed."]
        InProgress = 3,

        #[doc = "Application is under financial assessment."]
        Assessment = 4,

        #[doc = "Application awaits enrolment confirmation."]
        Enrolment = 5,

        #[doc = "Application is completed."]
        Completed = 6,

        #[doc = "Application is cancelled."]
        Cancelled = 7,

        #[doc = "Application is overwritten by a newer version."]
        Overwritten = 8,
    }
}

impl Status {
    /// Indicates whether an application in this [`Status`] may create or
    /// reissue agreements.
    #[must_use]
    pub const fn allows_agreement_issuing(self) -> bool {
        match self {
            Self::Draft | Self::Cancelled | Self::Overwritten => false,
            Self::Submitted
            | Self::InProgress
            | Self::Assessment
            | Self::Enrolment
            | Self::Completed => true,
        }
    }
}
