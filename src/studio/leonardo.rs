use super::{dom, Studio};
use crate::config::{BrowserConfig, Credentials, MotionSettings, Settings, SiteContract, Target};
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::{Browser, Page};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `Studio` backed by a stealth Chrome session driving the Leonardo.ai UI.
pub struct LeonardoStudio {
    browser: Browser,
    page: Page,
    site: SiteContract,
    http: reqwest::Client,
    human: bool,
    navigation_timeout: Duration,
    download_timeout: Duration,
}

impl LeonardoStudio {
    /// Launch the browser and open a blank page.
    pub async fn launch(settings: &Settings, site: SiteContract) -> Result<Self> {
        let config = &settings.browser;
        let browser = launch_browser(config).await?;
        let page = browser.new_page("about:blank").await?;
        let http = reqwest::Client::builder()
            .timeout(settings.timeouts.video)
            .build()?;

        Ok(Self {
            browser,
            page,
            site,
            http,
            human: config.human,
            navigation_timeout: settings.timeouts.navigation,
            download_timeout: settings.timeouts.video,
        })
    }

    async fn click(&self, target: &Target) -> Result<()> {
        let selector = dom::resolve_target(&self.page, target).await?;
        debug!("click: {}", target);
        if self.human {
            self.page.human_click(&selector).await?;
        } else {
            self.page.click(&selector).await?;
        }
        Ok(())
    }

    async fn fill(&self, target: &Target, value: &str) -> Result<()> {
        let selector = dom::resolve_target(&self.page, target).await?;
        if !dom::element_exists(&self.page, &selector).await? {
            return Err(Error::ElementNotFound(format!("{} not found", target)));
        }
        if self.human {
            self.page.human_fill(&selector, value).await?;
        } else {
            self.page.fill(&selector, value).await?;
        }
        Ok(())
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Download(format!("{} returned HTTP {}", url, status)));
        }
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::Download(format!("{} returned an empty body", url)));
        }
        Ok(bytes.to_vec())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        info!("Navigating to: {}", url);
        dom::goto(&self.page, url, self.navigation_timeout).await
    }
}

async fn launch_browser(config: &BrowserConfig) -> Result<Browser> {
    let stealth = eoka::StealthConfig {
        headless: config.headless,
        proxy: config.proxy.clone(),
        user_agent: config.user_agent.clone(),
        viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
        viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
        ..Default::default()
    };

    debug!(
        "Launching browser (headless: {}, proxy: {:?})",
        config.headless, config.proxy
    );
    Ok(Browser::launch_with_config(stealth).await?)
}

#[async_trait]
impl Studio for LeonardoStudio {
    async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        let login = &self.site.login;
        self.goto(&login.url).await?;
        let from_url = self.page.url().await?;

        self.fill(&login.email, &credentials.email).await?;
        self.fill(&login.password, &credentials.password).await?;
        debug!("fill: credentials for {}", credentials.email);

        self.click(&login.submit).await?;
        dom::wait_for_navigation(&self.page, &from_url, self.navigation_timeout).await
    }

    async fn generate_image(&mut self, prompt: &str, timeout: Duration) -> Result<String> {
        let image = &self.site.image;
        self.goto(&image.url).await?;

        let selector = dom::resolve_target(&self.page, &image.prompt).await?;
        dom::focus_element(&self.page, &selector).await?;
        self.page.click(&selector).await?;
        debug!("type: {} chars into {}", prompt.len(), image.prompt);
        self.page.type_text(prompt).await?;

        self.click(&image.generate).await?;
        info!("Waiting up to {}s for the image", timeout.as_secs());
        dom::wait_for_element(&self.page, &image.result, timeout, "image result").await?;
        dom::read_source(&self.page, &image.result).await
    }

    async fn generate_video(
        &mut self,
        image: &Path,
        motion: &MotionSettings,
        timeout: Duration,
    ) -> Result<String> {
        let video = &self.site.video;
        self.goto(&video.url).await?;

        // Headless Chrome never shows the native chooser; the click only
        // makes sure a lazily rendered file input exists.
        match dom::resolve_target(&self.page, &video.upload).await {
            Ok(selector) => {
                let _ = self.page.try_click(&selector).await;
            }
            Err(e) => debug!("upload control: {}", e),
        }
        dom::set_input_file(&self.page, &video.file_input, image).await?;

        let motion_select = dom::resolve_target(&self.page, &video.motion_type).await?;
        dom::select_option(&self.page, &motion_select, &motion.motion_type).await?;
        self.fill(&video.duration, &motion.duration_secs.to_string())
            .await?;

        self.click(&video.generate).await?;
        info!("Waiting up to {}s for the video", timeout.as_secs());
        dom::wait_for_element(&self.page, &video.result, timeout, "video result").await?;

        // Players either nest a <source> or carry src on the element itself.
        match dom::read_source(&self.page, &video.source).await {
            Ok(url) => Ok(url),
            Err(Error::ElementNotFound(_)) => dom::read_source(&self.page, &video.result).await,
            Err(e) => Err(e),
        }
    }

    async fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        debug!("fetch: {}", url);
        match dom::fetch_bytes(&self.page, url, self.download_timeout).await {
            Ok(bytes) => Ok(bytes),
            // CDN hosts without CORS headers refuse the page's fetch; the
            // asset URLs they serve are public.
            Err(e) if dom::is_network_url(url) => {
                warn!("in-page download failed ({}), retrying over HTTP", e);
                self.fetch_http(url).await
            }
            Err(e) => Err(e),
        }
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }

    async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
