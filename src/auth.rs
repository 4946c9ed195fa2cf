//! Authentication provider seam.
//!
//! The pipeline never talks to an identity service directly. It is handed an
//! [`AuthProvider`] and watches [`AuthProvider::current_user`] for changes.
//!
//! [`LocalAuthProvider`] is the bundled implementation: the identity is
//! supplied up front (by the `login` command) and the signed-in profile is
//! remembered in the [local store](crate::store) under [`PROFILE_KEY`].

use crate::store::{SharedStore, StoreError};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tokio::sync::watch;

/// Store key holding the signed-in profile as JSON.
pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("no identity to sign in with")]
    NoIdentity,
    #[error("invalid profile: {0}")]
    InvalidProfile(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub trait AuthProvider {
    /// Run the sign-in flow and publish the resulting profile.
    fn sign_in(&self) -> impl Future<Output = Result<UserProfile, AuthError>>;

    /// Forget the current user and publish `None`.
    fn sign_out(&self) -> Result<(), AuthError>;

    /// Observe the signed-in user.
    fn current_user(&self) -> watch::Receiver<Option<UserProfile>>;
}

pub struct LocalAuthProvider {
    store: SharedStore,
    identity: Option<UserProfile>,
    user: watch::Sender<Option<UserProfile>>,
}

impl LocalAuthProvider {
    /// Restore any remembered profile from the store.
    ///
    /// An unreadable stored profile is treated as signed out.
    pub fn new(store: SharedStore) -> Self {
        let remembered = store
            .borrow()
            .get(PROFILE_KEY)
            .and_then(|json| match serde_json::from_str::<UserProfile>(json) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unreadable stored profile");
                    None
                }
            });
        let (user, _) = watch::channel(remembered);
        Self {
            store,
            identity: None,
            user,
        }
    }

    /// The identity the next [`sign_in`](AuthProvider::sign_in) will use.
    pub fn with_identity(mut self, profile: UserProfile) -> Self {
        self.identity = Some(profile);
        self
    }
}

fn check_profile(profile: &UserProfile) -> Result<(), AuthError> {
    if profile.name.trim().is_empty() {
        return Err(AuthError::InvalidProfile("name is empty".into()));
    }
    let email = profile.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(AuthError::InvalidProfile(format!(
            "'{email}' is not an email address"
        ))),
    }
}

impl AuthProvider for LocalAuthProvider {
    async fn sign_in(&self) -> Result<UserProfile, AuthError> {
        let profile = self.identity.clone().ok_or(AuthError::NoIdentity)?;
        check_profile(&profile)?;
        let json = serde_json::to_string(&profile)
            .map_err(|e| AuthError::InvalidProfile(e.to_string()))?;
        self.store.borrow_mut().set(PROFILE_KEY, json)?;
        tracing::info!(id = %profile.id, "signed in");
        self.user.send_replace(Some(profile.clone()));
        Ok(profile)
    }

    fn sign_out(&self) -> Result<(), AuthError> {
        self.store.borrow_mut().remove(PROFILE_KEY)?;
        self.user.send_replace(None);
        tracing::info!("signed out");
        Ok(())
    }

    fn current_user(&self) -> watch::Receiver<Option<UserProfile>> {
        self.user.subscribe()
    }
}
