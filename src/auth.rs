//! The seam to the authentication collaborator. Sessions are established elsewhere; the portal
//! only asks whether one is active.

use crate::error::PortalError;

/// An authenticated administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub user: String,
}

pub trait SessionProvider {
    /// Returns the active admin session, if there is one.
    fn current_session(&self) -> Option<AdminSession>;

    /// Returns the active session or [`PortalError::Unauthorized`].
    fn require_session(&self) -> Result<AdminSession, PortalError> {
        self.current_session().ok_or(PortalError::Unauthorized)
    }
}

/// A session fixed up front, such as the operator named in the configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(Option<AdminSession>);

impl StaticSession {
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self(Some(AdminSession { user: user.into() }))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }

    /// Signs in `operator` if one is configured.
    pub fn from_operator(operator: Option<&str>) -> Self {
        match operator.map(str::trim) {
            Some(user) if !user.is_empty() => Self::signed_in(user),
            _ => Self::signed_out(),
        }
    }
}

impl SessionProvider for StaticSession {
    fn current_session(&self) -> Option<AdminSession> {
        self.0.clone()
    }
}
