//! Read entities definitions.

pub mod agreement;
pub mod application;
pub mod assessment;
pub mod disbursement;
