//! Identity collaborator.
//!
//! Supplies the optional owner ID that namespaces remote saves. Without an
//! owner the auto-save service runs local-only.

/// Source of the authenticated user's identity.
///
/// This trait abstracts the authentication layer, which is outside the engine.
/// Implementations are queried on `initialize` and before every save, so a
/// sign-in or sign-out during a session is picked up on the next save.
pub trait IdentityProvider: Send + Sync {
    /// Returns the current owner ID, or `None` when nobody is signed in.
    fn owner_id(&self) -> Option<String>;
}

/// Identity for signed-out sessions. Always local-only.
///
/// # Example
///
/// ```
/// use stackcanvas_core::identity::{AnonymousIdentity, IdentityProvider};
///
/// assert_eq!(AnonymousIdentity.owner_id(), None);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn owner_id(&self) -> Option<String> {
        None
    }
}

/// Identity fixed at construction time (CLI `--owner`, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    owner_id: Option<String>,
}

impl StaticIdentity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
        }
    }

    pub fn from_option(owner_id: Option<String>) -> Self {
        Self { owner_id }
    }
}

impl IdentityProvider for StaticIdentity {
    fn owner_id(&self) -> Option<String> {
        self.owner_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity() {
        assert_eq!(StaticIdentity::new("u-42").owner_id(), Some("u-42".to_string()));
        assert_eq!(StaticIdentity::from_option(None).owner_id(), None);
    }
}
