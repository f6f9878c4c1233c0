pub mod settings;
pub mod site;

pub use settings::{
    read_prompt, BrowserConfig, Credentials, MotionSettings, RetryConfig, Settings, Timeouts,
    Viewport,
};
pub use site::{ImagePage, LoginPage, SiteContract, Target, VideoPage};
