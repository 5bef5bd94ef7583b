//! Assessment read model definitions.

use crate::domain::{application, offering, student, Disbursement};

/// Assessment projection joining its offering scope with the full schedule of
/// [`Disbursement`]s.
#[derive(Clone, Debug)]
pub struct Disbursements {
    /// ID of the application the assessment was calculated for.
    pub application_id: application::Id,

    /// ID of the student the assessment belongs to.
    pub student_id: student::Id,

    /// [`offering::Intensity`] of the assessed offering.
    pub intensity: offering::Intensity,

    /// [`Date`] the assessed study period starts at.
    ///
    /// [`Date`]: common::Date
    pub study_start_date: offering::StudyStartDate,

    /// [`Date`] the assessed study period ends at.
    ///
    /// [`Date`]: common::Date
    pub study_end_date: offering::StudyEndDate,

    /// Scheduled [`Disbursement`]s, ordered by their payment date.
    pub schedules: Vec<Disbursement>,
}
