//! Call sites recorded in the generated code.

use strum::{Display, FromRepr};

use crate::information::ExactMethodId;

/// Encoding tag of a [`CallSite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum CallSiteKind {
    /// No call at this location
    None = 0,
    /// Statically dispatched call
    Static = 1,
    /// Virtually dispatched call; any override of the target may run
    Virtual = 2,
}

/// A call in the generated code and the method it targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallSite {
    /// No call at this location
    #[default]
    None,
    /// Statically dispatched call to the given exact method
    Static(ExactMethodId),
    /// Virtually dispatched call to the given exact method or one of its overrides
    Virtual(ExactMethodId),
}

impl CallSite {
    /// The encoding tag.
    #[must_use]
    pub fn kind(&self) -> CallSiteKind {
        match self {
            CallSite::None => CallSiteKind::None,
            CallSite::Static(_) => CallSiteKind::Static,
            CallSite::Virtual(_) => CallSiteKind::Virtual,
        }
    }

    /// The target method, unless this is [`CallSite::None`].
    #[must_use]
    pub fn method(&self) -> Option<ExactMethodId> {
        match self {
            CallSite::None => None,
            CallSite::Static(method) | CallSite::Virtual(method) => Some(*method),
        }
    }

    pub(crate) fn from_kind(kind: CallSiteKind, method: ExactMethodId) -> Self {
        match kind {
            CallSiteKind::None => CallSite::None,
            CallSiteKind::Static => CallSite::Static(method),
            CallSiteKind::Virtual => CallSite::Virtual(method),
        }
    }
}
