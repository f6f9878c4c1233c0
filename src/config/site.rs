use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Contract for leonardo.ai, compiled into the binary.
const LEONARDO_YAML: &str = include_str!("../../sites/leonardo.yaml");

/// A target element - either by CSS selector or visible text.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Target {
    /// CSS selector.
    pub selector: Option<String>,
    /// Visible text to find.
    pub text: Option<String>,
}

impl Target {
    pub fn selector(selector: impl Into<String>) -> Self {
        Self {
            selector: Some(selector.into()),
            text: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            selector: None,
            text: Some(text.into()),
        }
    }

    fn is_empty(&self) -> bool {
        self.selector.as_deref().map_or(true, str::is_empty)
            && self.text.as_deref().map_or(true, str::is_empty)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.selector, &self.text) {
            (Some(s), _) => write!(f, "selector '{}'", s),
            (_, Some(t)) => write!(f, "text '{}'", t),
            _ => write!(f, "unknown"),
        }
    }
}

/// Every URL, control and result selector of the remote UI.
///
/// The remote markup is unversioned and can change at any time; when it
/// does, only this document needs to follow.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteContract {
    pub login: LoginPage,
    pub image: ImagePage,
    pub video: VideoPage,
}

/// Login form.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginPage {
    pub url: String,
    pub email: Target,
    pub password: Target,
    pub submit: Target,
}

/// Text-to-image generator.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagePage {
    pub url: String,
    pub prompt: Target,
    pub generate: Target,
    /// `<img>` whose appearance marks a finished generation.
    pub result: String,
}

/// Image-to-video generator.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoPage {
    pub url: String,
    /// Control that opens the file picker.
    pub upload: Target,
    /// `<input type="file">` receiving the image.
    pub file_input: String,
    pub motion_type: Target,
    pub duration: Target,
    pub generate: Target,
    /// Element whose appearance marks a finished generation.
    pub result: String,
    /// Element carrying the video URL in `src`.
    pub source: String,
}

impl SiteContract {
    /// The built-in leonardo.ai contract.
    pub fn builtin() -> Result<Self> {
        Self::parse(LEONARDO_YAML)
    }

    /// Load a contract from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a contract from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let contract: SiteContract = serde_yaml::from_str(yaml)?;
        contract.validate()?;
        Ok(contract)
    }

    fn validate(&self) -> Result<()> {
        let urls = [
            ("login.url", &self.login.url),
            ("image.url", &self.image.url),
            ("video.url", &self.video.url),
        ];
        for (field, url) in urls {
            if url.is_empty() {
                return Err(Error::Config(format!("{} is required", field)));
            }
        }

        let targets = [
            ("login.email", &self.login.email),
            ("login.password", &self.login.password),
            ("login.submit", &self.login.submit),
            ("image.prompt", &self.image.prompt),
            ("image.generate", &self.image.generate),
            ("video.upload", &self.video.upload),
            ("video.motion_type", &self.video.motion_type),
            ("video.duration", &self.video.duration),
            ("video.generate", &self.video.generate),
        ];
        for (field, target) in targets {
            if target.is_empty() {
                return Err(Error::Config(format!(
                    "{}: either 'selector' or 'text' is required",
                    field
                )));
            }
        }

        let selectors = [
            ("image.result", &self.image.result),
            ("video.file_input", &self.video.file_input),
            ("video.result", &self.video.result),
            ("video.source", &self.video.source),
        ];
        for (field, selector) in selectors {
            if selector.is_empty() {
                return Err(Error::Config(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r##"
login:
  url: "https://example.com/login"
  email: { selector: "#email" }
  password: { selector: "#password" }
  submit: { text: "Sign in" }
image:
  url: "https://example.com/image"
  prompt: { selector: "textarea" }
  generate: { text: "Generate" }
  result: ".result img"
video:
  url: "https://example.com/video"
  upload: { text: "Upload" }
  file_input: "input[type=file]"
  motion_type: { selector: "select" }
  duration: { selector: "#duration" }
  generate: { text: "Go" }
  result: "video"
  source: "video source"
"##;

    #[test]
    fn test_parse_contract() {
        let site = SiteContract::parse(MINIMAL).unwrap();
        assert_eq!(site.login.url, "https://example.com/login");
        assert_eq!(site.login.email, Target::selector("#email"));
        assert_eq!(site.login.submit, Target::text("Sign in"));
        assert_eq!(site.video.file_input, "input[type=file]");
    }

    #[test]
    fn test_builtin_matches_leonardo_markup() {
        let site = SiteContract::builtin().unwrap();
        assert_eq!(
            site.login.email.selector.as_deref(),
            Some(r#"input[name="email"]"#)
        );
        assert_eq!(
            site.image.prompt.selector.as_deref(),
            Some(r#"textarea[placeholder="Enter your prompt..."]"#)
        );
        assert_eq!(site.image.generate.text.as_deref(), Some("Generate"));
        assert_eq!(site.video.upload.text.as_deref(), Some("Upload Image"));
        assert_eq!(site.video.source, ".video-result video source");
    }

    #[test]
    fn test_validation_empty_url() {
        let yaml = MINIMAL.replace("https://example.com/video", "");
        let err = SiteContract::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("video.url"));
    }

    #[test]
    fn test_validation_empty_target() {
        let yaml = MINIMAL.replace(r#"generate: { text: "Go" }"#, "generate: {}");
        let err = SiteContract::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("video.generate"));
    }

    #[test]
    fn test_missing_section_is_yaml_error() {
        let yaml = r#"
login:
  url: "https://example.com/login"
"#;
        assert!(matches!(SiteContract::parse(yaml), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::selector("#btn").to_string(), "selector '#btn'");
        assert_eq!(Target::text("Generate").to_string(), "text 'Generate'");
        assert_eq!(Target::default().to_string(), "unknown");
    }
}
