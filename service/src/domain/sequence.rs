//! Agreement number sequence definitions.

use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

use crate::domain::offering;

/// Name of a counter scope agreement numbers are drawn from.
///
/// One [`Group`] exists per [`offering::Intensity`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Group(String);

impl From<offering::Intensity> for Group {
    fn from(intensity: offering::Intensity) -> Self {
        match intensity {
            offering::Intensity::FullTime => Self("msfaa_full_time".into()),
            offering::Intensity::PartTime => Self("msfaa_part_time".into()),
        }
    }
}

/// Number drawn from a [`Group`].
///
/// Strictly increases within its [`Group`] and is never issued twice.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    From,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Number(i64);

#[cfg(test)]
mod spec {
    use crate::domain::offering::Intensity;

    use super::Group;

    #[test]
    fn derives_group_name_from_intensity() {
        assert_eq!(
            Group::from(Intensity::FullTime).to_string(),
            "msfaa_full_time",
        );
        assert_eq!(
            Group::from(Intensity::PartTime).to_string(),
            "msfaa_part_time",
        );
    }
}
