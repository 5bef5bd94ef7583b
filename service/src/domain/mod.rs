//! Domain definitions.

pub mod actor;
pub mod agreement;
pub mod application;
pub mod assessment;
pub mod disbursement;
pub mod legacy;
pub mod offering;
pub mod sequence;
pub mod student;

pub use self::{agreement::Agreement, disbursement::Disbursement};
