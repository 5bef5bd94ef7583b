//! Disbursement read model definitions.

use crate::domain::{agreement, offering, Agreement};

/// [`Agreement`] backing the most recently paid (or picked for payment)
/// disbursement of a (student, intensity) scope, joined with the study period
/// that disbursement was scheduled within.
#[derive(Clone, Debug)]
pub struct PriorIssued {
    /// [`Agreement`] the disbursement was paid under.
    pub agreement: Agreement,

    /// [`Date`] the disbursement's study period ended at.
    ///
    /// [`Date`]: common::Date
    pub study_end_date: offering::StudyEndDate,
}

impl PriorIssued {
    /// Indicates whether this [`PriorIssued`] agreement still covers a study
    /// period starting at the given [`Date`].
    ///
    /// Coverage lasts [`VALIDITY_WINDOW_YEARS`] beyond the end of the study
    /// period the agreement was last paid within, boundary day included.
    ///
    /// [`Date`]: common::Date
    /// [`VALIDITY_WINDOW_YEARS`]: agreement::VALIDITY_WINDOW_YEARS
    #[must_use]
    pub fn is_within_validity_window(
        &self,
        start: offering::StudyStartDate,
    ) -> bool {
        self.study_end_date
            .years_after(agreement::VALIDITY_WINDOW_YEARS)
            .coerce()
            >= start
    }
}
