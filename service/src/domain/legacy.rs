//! Definitions of records imported from the legacy aid system.

use crate::domain::agreement;

/// Signed agreement carried over from the legacy aid system.
///
/// Legacy records keep their original number and signing date, and turn into
/// a regular [`agreement::Agreement`] the first time a disbursement of the
/// same (student, intensity) scope needs one.
#[derive(Clone, Debug)]
pub struct Agreement {
    /// Original [`agreement::Number`] assigned by the legacy system.
    pub number: agreement::Number,

    /// [`Date`] the agreement was signed at in the legacy system.
    ///
    /// [`Date`]: common::Date
    pub date_signed: agreement::SigningDate,
}
