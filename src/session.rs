//! A signed-in user's working session.
//!
//! [`Session`] owns the [`Controller`] and the collaborators it sequences:
//! the generator, the auth provider, the export renderer and the local
//! store. Every user action goes through here, so the controller itself never
//! touches global state, the network, or the filesystem.

use crate::auth::{AuthError, AuthProvider, UserProfile};
use crate::credentials::{Credentials, KeySource};
use crate::export::{self, ExportError, ExportRenderer};
use crate::generation::{GenerationError, ImageGenerator};
use crate::imaging::{ImageBackend, RustBackend};
use crate::intake::{self, FileHandle, ValidationError};
use crate::locale::{Locale, stored_locale};
use crate::pipeline::{Controller, PipelineError, PipelineState};
use crate::store::{API_KEY, SharedStore, StoreError};
use crate::types::{ColorChoice, EncodedFile, EncodedImage, GenerationResult, PrintSize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("please sign in first (`idphoto login`)")]
    NotSignedIn,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GenerationError> for SessionError {
    fn from(e: GenerationError) -> Self {
        Self::Pipeline(PipelineError::Generation(e))
    }
}

impl From<ExportError> for SessionError {
    fn from(e: ExportError) -> Self {
        Self::Pipeline(PipelineError::Export(e))
    }
}

pub struct Session<G, A, B = RustBackend>
where
    G: ImageGenerator,
    A: AuthProvider,
    B: ImageBackend,
{
    controller: Controller,
    generator: G,
    auth: A,
    user: watch::Receiver<Option<UserProfile>>,
    renderer: ExportRenderer<B>,
    store: SharedStore,
    default_key: Option<String>,
    key_override: Option<String>,
}

impl<G, A, B> Session<G, A, B>
where
    G: ImageGenerator,
    A: AuthProvider,
    B: ImageBackend,
{
    pub fn new(
        generator: G,
        auth: A,
        renderer: ExportRenderer<B>,
        store: SharedStore,
        default_key: Option<String>,
    ) -> Self {
        let user = auth.current_user();
        Self {
            controller: Controller::new(),
            generator,
            auth,
            user,
            renderer,
            store,
            default_key,
            key_override: None,
        }
    }

    /// Use this key for the session instead of the stored one.
    pub fn with_key_override(mut self, key: Option<String>) -> Self {
        self.key_override = key;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.controller.state()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.user.borrow().clone()
    }

    /// React to sign-in changes published by the auth provider.
    ///
    /// Losing the user clears the pipeline, as an explicit sign-out does.
    fn observe_auth(&mut self) -> Result<(), SessionError> {
        if self.user.has_changed().unwrap_or(false) && self.user.borrow_and_update().is_none() {
            self.controller.reset();
        }
        if self.user.borrow().is_none() {
            return Err(SessionError::NotSignedIn);
        }
        Ok(())
    }

    pub fn locale(&self) -> Locale {
        stored_locale(&self.store.borrow())
    }

    /// Candidate keys: the override or stored user key, then the default.
    pub fn credentials(&self) -> Credentials {
        let user_key = self
            .key_override
            .clone()
            .or_else(|| self.store.borrow().get(API_KEY).map(str::to_string));
        Credentials::new(user_key, self.default_key.clone())
    }

    /// Which key a request would use right now, if any.
    pub fn key_source(&self) -> Option<KeySource> {
        self.credentials().resolve_with_source().ok().map(|(_, s)| s)
    }

    /// Validate a file and start a new cycle with it.
    ///
    /// On validation failure nothing changes.
    pub async fn upload(&mut self, file: &FileHandle) -> Result<&EncodedImage, SessionError> {
        self.observe_auth()?;
        let image = intake::validate(file).await?;
        if self.controller.load(image).is_some() {
            tracing::debug!("previous photo released");
        }
        self.controller
            .source()
            .ok_or(SessionError::Pipeline(PipelineError::NoImage))
    }

    pub fn choose_color(&mut self, color: ColorChoice) -> Result<(), SessionError> {
        self.observe_auth()?;
        Ok(self.controller.select_color(color)?)
    }

    /// Ask the service for a new background.
    pub async fn generate(&mut self) -> Result<&GenerationResult, SessionError> {
        self.observe_auth()?;
        let credentials = self.credentials();
        Ok(self.controller.generate(&self.generator, &credentials).await?)
    }

    /// Dismiss a failed generation; returns the error that caused it.
    pub fn acknowledge(&mut self) -> Result<Option<GenerationError>, SessionError> {
        Ok(self.controller.acknowledge_failure()?)
    }

    pub fn export(&self, size: PrintSize) -> Result<EncodedFile, SessionError> {
        Ok(self.controller.export(&self.renderer, size)?)
    }

    /// Export and write the file into `dir`.
    pub fn download(&self, size: PrintSize, dir: &Path) -> Result<PathBuf, SessionError> {
        let file = self.export(size)?;
        Ok(export::save(&file, dir)?)
    }

    /// Sign out and drop the current photo, color and result.
    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.auth.sign_out()?;
        self.user.mark_unchanged();
        self.controller.reset();
        Ok(())
    }
}
