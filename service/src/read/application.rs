//! Application read model definitions.

use crate::domain::{application, assessment, offering, student};

/// Application projection carrying exactly the fields agreement issuing
/// validates.
#[derive(Clone, Copy, Debug)]
pub struct Overview {
    /// ID of the student who filed the application.
    pub student_id: student::Id,

    /// Current [`application::Status`] of the application.
    pub status: application::Status,

    /// ID of the application's current assessment, if one was calculated.
    pub assessment_id: Option<assessment::Id>,

    /// [`offering::Intensity`] of the current assessment's offering, if the
    /// assessment exists and points to one.
    pub intensity: Option<offering::Intensity>,
}
