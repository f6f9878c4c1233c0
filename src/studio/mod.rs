//! The seam between the flow and whatever renders the generator UI.

pub mod dom;
mod leonardo;

pub use leonardo::LeonardoStudio;

use crate::config::{Credentials, MotionSettings};
use crate::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Operations the flow performs against the generator site.
///
/// Each call blocks until the page reaches the awaited state or fails.
/// Implementations own their session; `close` must release it.
#[async_trait]
pub trait Studio: Send + Sized {
    /// Sign in and wait for the post-login navigation.
    async fn login(&mut self, credentials: &Credentials) -> Result<()>;

    /// Submit `prompt` and return the URL of the first generated image.
    async fn generate_image(&mut self, prompt: &str, timeout: Duration) -> Result<String>;

    /// Upload `image`, apply `motion`, and return the URL of the generated video.
    async fn generate_video(
        &mut self,
        image: &Path,
        motion: &MotionSettings,
        timeout: Duration,
    ) -> Result<String>;

    /// Download a generated asset (`http(s)`, `data:` or `blob:` URL).
    async fn fetch(&mut self, url: &str) -> Result<Vec<u8>>;

    /// PNG capture of the current page.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;

    /// Release the session.
    async fn close(self) -> Result<()>;
}
