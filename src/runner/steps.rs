use crate::config::{read_prompt, Settings};
use crate::studio::Studio;
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One stage of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Login,
    GenerateImage,
    GenerateVideo,
    Cleanup,
}

impl Step {
    /// Execution order. There are no alternative paths.
    pub const ALL: [Step; 4] = [
        Step::Login,
        Step::GenerateImage,
        Step::GenerateVideo,
        Step::Cleanup,
    ];

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::GenerateImage => "generate_image",
            Self::GenerateVideo => "generate_video",
            Self::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Artifacts produced so far.
#[derive(Debug, Default)]
pub struct FlowState {
    pub image_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
}

/// Execute a single step against the studio.
pub async fn execute<S: Studio>(
    step: Step,
    studio: &mut S,
    settings: &Settings,
    state: &mut FlowState,
) -> Result<()> {
    match step {
        Step::Login => {
            info!("Logging in as {}", settings.credentials.email);
            studio.login(&settings.credentials).await?;
        }
        Step::GenerateImage => {
            let prompt = read_prompt(&settings.prompt_file).await?;
            info!("Generating image ({} chars of prompt)", prompt.len());
            let url = studio.generate_image(&prompt, settings.timeouts.image).await?;
            debug!("image url: {}", url);

            let path = settings.image_path();
            download(studio, &url, &path, settings).await?;
            state.image_path = Some(path);
        }
        Step::GenerateVideo => {
            let image = state.image_path.as_deref().ok_or_else(|| {
                Error::ActionFailed("no image available for video generation".into())
            })?;
            info!(
                "Generating {}s '{}' video",
                settings.motion.duration_secs, settings.motion.motion_type
            );
            let url = studio
                .generate_video(image, &settings.motion, settings.timeouts.video)
                .await?;
            debug!("video url: {}", url);

            let path = settings.video_path();
            download(studio, &url, &path, settings).await?;
            state.video_path = Some(path);
        }
        Step::Cleanup => {
            if let Some(image) = state.image_path.take() {
                info!("Removing intermediate image {}", image.display());
                tokio::fs::remove_file(&image).await?;
            }
        }
    }
    Ok(())
}

/// Fetch `url` and write it to `path`, retrying the fetch per settings.
async fn download<S: Studio>(
    studio: &mut S,
    url: &str,
    path: &Path,
    settings: &Settings,
) -> Result<()> {
    let attempts = settings.retry.attempts.max(1);
    let mut attempt = 1;
    let bytes = loop {
        match studio.fetch(url).await {
            Ok(bytes) => break bytes,
            Err(e) if attempt < attempts => {
                warn!("Download attempt {}/{} failed: {}", attempt, attempts, e);
                attempt += 1;
                if settings.retry.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(settings.retry.delay_ms)).await;
                }
            }
            Err(e) => return Err(e),
        }
    };
    write_asset(path, &bytes).await?;
    info!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Write bytes to disk, creating parent directories.
pub async fn write_asset(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        let names: Vec<_> = Step::ALL.iter().map(Step::name).collect();
        assert_eq!(
            names,
            vec!["login", "generate_image", "generate_video", "cleanup"]
        );
    }

    #[test]
    fn test_step_display() {
        assert_eq!(Step::GenerateVideo.to_string(), "generate_video");
    }

    #[tokio::test]
    async fn test_write_asset_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("a.bin");
        write_asset(&path, b"data").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }
}
