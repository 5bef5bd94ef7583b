//! [`Agreement`] definitions.

use common::{unit, DateOf, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{actor, application, offering, sequence, student};

/// Number of calendar years after a study period's end during which its
/// signed [`Agreement`] keeps covering newly starting offerings.
pub const VALIDITY_WINDOW_YEARS: i32 = 2;

/// Master student financial aid agreement (MSFAA).
///
/// Identified by a unique [`Number`], scoped to one student and one
/// [`offering::Intensity`], and required to be signed before disbursements
/// relying on it are paid.
#[derive(Clone, Debug)]
pub struct Agreement {
    /// ID of this [`Agreement`].
    pub id: Id,

    /// Externally visible [`Number`] of this [`Agreement`].
    ///
    /// Unique within the [`sequence::Group`] of its intensity.
    pub number: Number,

    /// ID of the student this [`Agreement`] belongs to.
    pub student_id: student::Id,

    /// [`offering::Intensity`] this [`Agreement`] is scoped to.
    ///
    /// Agreements are never shared across intensities.
    pub intensity: offering::Intensity,

    /// ID of the application that caused this [`Agreement`]'s creation.
    ///
    /// Provenance only, not an ownership relation.
    pub reference_application_id: application::Id,

    /// [`Date`] when this [`Agreement`] was signed, if it was.
    ///
    /// Set by an external signing process.
    ///
    /// [`Date`]: common::Date
    pub date_signed: Option<SigningDate>,

    /// [`Date`] when this [`Agreement`] was cancelled, if it was.
    ///
    /// Set when superseded by a newer [`Agreement`] or administratively
    /// invalidated.
    ///
    /// [`Date`]: common::Date
    pub cancelled_date: Option<CancellationDate>,

    /// [`DateTime`] when this [`Agreement`] was created.
    ///
    /// [`DateTime`]: common::DateTime
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Agreement`] was last modified, if it was.
    ///
    /// [`DateTime`]: common::DateTime
    pub updated_at: Option<ModificationDateTime>,

    /// ID of the actor who created this [`Agreement`].
    pub creator_id: actor::Id,

    /// ID of the actor who last modified this [`Agreement`], if any.
    pub modifier_id: Option<actor::Id>,
}

impl Agreement {
    /// Returns whether this [`Agreement`] is signed.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.date_signed.is_some()
    }

    /// Returns whether this [`Agreement`] is active (not cancelled).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancelled_date.is_none()
    }
}

/// ID of an [`Agreement`].
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

/// Externally visible number of an [`Agreement`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(String);

impl Number {
    /// Creates a new [`Number`].
    ///
    /// # Safety
    ///
    /// The caller must ensure that the given `number` is a plain decimal.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    /// Creates a new [`Number`] if the given `number` is valid.
    #[must_use]
    pub fn new(number: impl Into<String>) -> Option<Self> {
        let number = number.into();
        Self::check(&number).then_some(Self(number))
    }

    /// Checks whether the given `number` is a valid [`Number`].
    fn check(number: impl AsRef<str>) -> bool {
        let number = number.as_ref();
        !number.is_empty()
            && number.len() <= 20
            && number.bytes().all(|b| b.is_ascii_digit())
    }
}

impl From<sequence::Number> for Number {
    fn from(number: sequence::Number) -> Self {
        Self(i64::from(number).to_string())
    }
}

impl FromStr for Number {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Number`")
    }
}

/// Cancellation of every unsigned active [`Agreement`] within a
/// (student, intensity) scope.
///
/// Applied right before a new [`Agreement`] of the scope is persisted, so
/// that at most one stays active.
#[derive(Clone, Copy, Debug)]
pub struct Supersession {
    /// ID of the student whose [`Agreement`]s are superseded.
    pub student_id: student::Id,

    /// [`offering::Intensity`] scoping the superseded [`Agreement`]s.
    pub intensity: offering::Intensity,

    /// [`Date`] the superseded [`Agreement`]s are cancelled at.
    ///
    /// [`Date`]: common::Date
    pub cancelled_date: CancellationDate,

    /// [`DateTime`] of the modification.
    ///
    /// [`DateTime`]: common::DateTime
    pub modified_at: ModificationDateTime,

    /// ID of the actor recorded as the modifier.
    pub modifier_id: actor::Id,
}

/// [`DateTime`] when an [`Agreement`] was created.
///
/// [`DateTime`]: common::DateTime
pub type CreationDateTime = DateTimeOf<(Agreement, unit::Creation)>;

/// [`DateTime`] when an [`Agreement`] was last modified.
///
/// [`DateTime`]: common::DateTime
pub type ModificationDateTime = DateTimeOf<(Agreement, unit::Modification)>;

/// Marker type indicating [`Agreement`] signing.
#[derive(Clone, Copy, Debug)]
pub struct Signing;

/// [`Date`] when an [`Agreement`] was signed.
///
/// [`Date`]: common::Date
pub type SigningDate = DateOf<(Agreement, Signing)>;

/// Marker type indicating [`Agreement`] cancellation.
#[derive(Clone, Copy, Debug)]
pub struct Cancellation;

/// [`Date`] when an [`Agreement`] was cancelled.
///
/// [`Date`]: common::Date
pub type CancellationDate = DateOf<(Agreement, Cancellation)>;

#[cfg(test)]
mod spec {
    use crate::domain::sequence;

    use super::Number;

    #[test]
    fn formats_number_as_plain_decimal() {
        assert_eq!(Number::from(sequence::Number::from(1)).to_string(), "1");
        assert_eq!(
            Number::from(sequence::Number::from(5208)).to_string(),
            "5208",
        );
    }

    #[test]
    fn validates_number_as_digits_only() {
        assert_eq!(Number::new("5208"), "5208".parse().ok());
        assert_eq!(Number::new(""), None);
        assert_eq!(Number::new("52A8"), None);
        assert_eq!(Number::new(" 5208"), None);
    }
}
