//! # leonardo-motion
//!
//! Drives the Leonardo.ai web UI end to end: log in, generate an image from a
//! prompt file, turn that image into a motion video, keep only the video.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leonardo_motion::{runner, LeonardoStudio, Settings, SiteContract};
//!
//! # #[tokio::main]
//! # async fn main() -> leonardo_motion::Result<()> {
//! let settings = Settings::from_env()?;
//! runner::prepare(&settings).await?;
//!
//! let studio = LeonardoStudio::launch(&settings, SiteContract::builtin()?).await?;
//! let report = runner::run(&settings, studio).await?;
//! println!("Video siap: {}", report.video_path.display());
//! # Ok(())
//! # }
//! ```

mod config;
pub mod runner;
pub mod studio;

pub use config::{
    read_prompt, BrowserConfig, Credentials, ImagePage, LoginPage, MotionSettings, RetryConfig,
    Settings, SiteContract, Target, Timeouts, VideoPage, Viewport,
};
pub use runner::{RunReport, Step};
pub use studio::{LeonardoStudio, Studio};

/// Result type for leonardo-motion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running the flow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("missing required credentials: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("download failed: {0}")]
    Download(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("action failed: {0}")]
    ActionFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Short label used when reporting the error at the process boundary.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) | Self::MissingCredentials(_) | Self::Yaml(_) => "config",
            Self::Timeout(_) => "timeout",
            Self::ElementNotFound(_) | Self::ActionFailed(_) => "dom",
            Self::Io(_) => "io",
            Self::Browser(_) => "browser",
            Self::Http(_) | Self::Download(_) => "network",
        }
    }
}
