//! Education offering definitions.
//!
//! Offerings are owned by an external subsystem. Only their intensity and
//! study period bounds feed the agreement validity-window computation here.

use common::{define_kind, DateOf};

define_kind! {
    #[doc = "Intensity of an education offering."]
    enum Intensity {
        #[doc = "Full-time study."]
        FullTime = 1,

        #[doc = "Part-time study."]
        PartTime = 2,
    }
}

/// Marker type indicating a study period start.
#[derive(Clone, Copy, Debug)]
pub struct StudyStart;

/// [`Date`] when the study period of an offering starts.
///
/// [`Date`]: common::Date
pub type StudyStartDate = DateOf<StudyStart>;

/// Marker type indicating a study period end.
#[derive(Clone, Copy, Debug)]
pub struct StudyEnd;

/// [`Date`] when the study period of an offering ends.
///
/// [`Date`]: common::Date
pub type StudyEndDate = DateOf<StudyEnd>;
