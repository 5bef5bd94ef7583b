//! Agreement read model definitions.

#[cfg(doc)]
use crate::domain::Agreement;

/// Wrapper around [`Agreement`] indicating that it [`is_active()`].
///
/// [`is_active()`]: Agreement::is_active
#[derive(Clone, Copy, Debug)]
pub struct Active<T>(pub T);

/// Wrapper around [`Agreement`] indicating that it [`is_signed()`] and
/// [`is_active()`].
///
/// [`is_active()`]: Agreement::is_active
/// [`is_signed()`]: Agreement::is_signed
#[derive(Clone, Copy, Debug)]
pub struct Signed<T>(pub T);
