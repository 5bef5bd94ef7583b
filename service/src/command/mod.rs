//! [`Command`] definition.

pub mod associate_agreement;
pub mod create_agreement;
mod issue_agreement;
pub mod reissue_agreement;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    associate_agreement::AssociateAgreement, create_agreement::CreateAgreement,
    reissue_agreement::ReissueAgreement,
};
