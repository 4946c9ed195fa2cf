//! # idphoto
//!
//! Turns a portrait into a standard ID photo: the background is replaced with
//! a uniform red or blue by a generative image model, and the result is
//! scaled to common print sizes and saved as JPEG.
//!
//! # Architecture: One Photo, One Cycle
//!
//! Each upload starts a cycle that moves through a small state machine owned
//! by the [`pipeline::Controller`]:
//!
//! ```text
//! Empty → Loaded → ColorSelected → Generating → Ready
//!                       ↑               ↓
//!                       └──── ack ──── Failed
//! ```
//!
//! The controller is pure state. Everything with side effects sits behind a
//! seam and is wired together by [`session::Session`]:
//!
//! - **Generation** goes through the [`generation::ImageGenerator`] trait. The
//!   bundled [`generation::GeminiClient`] calls Gemini's `generateContent`
//!   endpoint; tests substitute a mock.
//! - **Identity** goes through [`auth::AuthProvider`], observed as a
//!   `tokio::sync::watch` channel so sign-out can clear the pipeline.
//! - **Pixels** go through [`imaging::ImageBackend`]: decode, scale to the
//!   exact target size, encode JPEG.
//!
//! At most one generation request is in flight. A request that resolves after
//! its cycle was replaced by a newer upload is discarded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Encoded images, color and print-size choices, exported files |
//! | [`intake`] | Upload validation: declared type must be `image/*`, size ≤ 10 MiB |
//! | [`pipeline`] | The state machine, generation gate and stale-result handling |
//! | [`generation`] | Prompt building, Gemini wire types, HTTP client, response parsing |
//! | [`credentials`] | API key resolution: user key first, then the built-in default |
//! | [`export`] | Scaling the generated image to print sizes and saving JPEGs |
//! | [`imaging`] | Pure-Rust image operations behind the `ImageBackend` trait |
//! | [`session`] | Ties the controller to the generator, auth, renderer and store |
//! | [`auth`] | Sign-in seam and the local profile provider |
//! | [`store`] | Persistent key/value settings (API key, language, profile) |
//! | [`locale`] | Instruction language selection |
//! | [`config`] | `config.toml` loading over stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Exact Print Dimensions
//!
//! Exports are scaled to exactly 295×413 (1-inch) or 413×626 (2-inch) pixels
//! regardless of the generated image's aspect ratio. Print shops expect those
//! sizes; a slightly stretched face is less of a problem than a rejected photo.
//!
//! ## The Key Lives in Plain Text
//!
//! A user-supplied API key is kept in the settings store as-is. A key baked
//! in at build time (`APP_GEMINI_API_KEY`) is the fallback. Neither is ever
//! printed unmasked.

pub mod auth;
pub mod config;
pub mod credentials;
pub mod export;
pub mod generation;
pub mod imaging;
pub mod intake;
pub mod locale;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
