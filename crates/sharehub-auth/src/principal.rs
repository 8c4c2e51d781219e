//! The identity behind a request.

use std::fmt;

use uuid::Uuid;

/// Who is making a request.
///
/// Share-link holders are `Anonymous`; their rights come from the share
/// credential that accompanies the request, never from the principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    /// A user authenticated by bearer token.
    User(Uuid),
    /// No valid bearer token.
    Anonymous,
}

impl Principal {
    /// The authenticated user ID, if any.
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            Self::Anonymous => None,
        }
    }

    /// Whether this principal is the given user.
    pub fn is(&self, user_id: Uuid) -> bool {
        self.user_id() == Some(user_id)
    }

    /// Whether a bearer token was presented and verified.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Anonymous => write!(f, "anonymous"),
        }
    }
}
