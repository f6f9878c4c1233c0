//! In-page helpers built on `Page::evaluate`.

use crate::config::Target;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use eoka::Page;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Interval between presence checks while waiting for an element.
const POLL_INTERVAL_MS: u64 = 500;

/// Quiet period that counts as "network idle" after a navigation.
const IDLE_MS: u64 = 500;

/// Find element by text - returns CSS selector.
const FIND_BY_TEXT_JS: &str = r#"(() => {
    const text = arguments[0];
    const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_ELEMENT, null);
    while (walker.nextNode()) {
        const el = walker.currentNode;
        if (el.textContent?.trim().toLowerCase().includes(text.toLowerCase())) {
            if (el.matches('a, button, input, select, [role="button"], [onclick]')) {
                if (el.id) return '#' + el.id;
                const path = [];
                let node = el;
                while (node && node !== document.body) {
                    let selector = node.tagName.toLowerCase();
                    if (node.id) {
                        path.unshift('#' + node.id);
                        break;
                    }
                    const siblings = Array.from(node.parentNode?.children || []);
                    const index = siblings.indexOf(node) + 1;
                    if (siblings.length > 1) selector += ':nth-child(' + index + ')';
                    path.unshift(selector);
                    node = node.parentNode;
                }
                return path.join(' > ');
            }
        }
    }
    return null;
})()"#;

/// `window` property holding the state of in-flight page fetches.
const FETCH_SLOT: &str = "__leonardoFetch";

static FETCH_SEQ: AtomicU64 = AtomicU64::new(0);

/// Quote a string as a JS literal.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

/// Resolve a Target to a CSS selector.
pub async fn resolve_target(page: &Page, target: &Target) -> Result<String> {
    if let Some(ref sel) = target.selector {
        return Ok(sel.clone());
    }
    if let Some(ref txt) = target.text {
        let js = FIND_BY_TEXT_JS.replace("arguments[0]", &js_string(txt));
        let result: Option<String> = page.evaluate(&js).await?;
        if let Some(sel) = result {
            return Ok(sel);
        }
        return Err(Error::ElementNotFound(format!(
            "element with text '{}' not found",
            txt
        )));
    }
    Err(Error::ActionFailed(
        "either selector or text must be provided".into(),
    ))
}

/// Navigate and give the page a chance to go quiet.
pub async fn goto(page: &Page, url: &str, timeout: Duration) -> Result<()> {
    debug!("goto: {}", url);
    page.goto(url).await?;
    // Long-polling pages never go fully idle; the elements we need are
    // awaited separately.
    let _ = page
        .wait_for_network_idle(IDLE_MS, timeout.as_millis() as u64)
        .await;
    Ok(())
}

pub async fn element_exists(page: &Page, selector: &str) -> Result<bool> {
    let js = format!("!!document.querySelector({})", js_string(selector));
    Ok(page.evaluate(&js).await?)
}

/// Poll until `selector` matches, failing with `Error::Timeout` once
/// `timeout` has elapsed.
pub async fn wait_for_element(
    page: &Page,
    selector: &str,
    timeout: Duration,
    what: &str,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if element_exists(page, selector).await? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "{} ('{}') did not appear within {}s",
                what,
                selector,
                timeout.as_secs()
            )));
        }
        page.wait(POLL_INTERVAL_MS).await;
    }
}

/// Wait for the page to leave `from_url`.
pub async fn wait_for_navigation(page: &Page, from_url: &str, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let url = page.url().await?;
        if url != from_url {
            debug!("navigated to {}", url);
            let _ = page
                .wait_for_network_idle(IDLE_MS, timeout.as_millis() as u64)
                .await;
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "navigation away from {} did not happen within {}s",
                from_url,
                timeout.as_secs()
            )));
        }
        page.wait(POLL_INTERVAL_MS).await;
    }
}

pub async fn focus_element(page: &Page, selector: &str) -> Result<()> {
    let js = format!(
        "(() => {{ const el = document.querySelector({}); if (!el) return false; el.focus(); return true; }})()",
        js_string(selector)
    );
    let focused: bool = page.evaluate(&js).await?;
    if !focused {
        return Err(Error::ElementNotFound(format!(
            "'{}' not found",
            selector
        )));
    }
    Ok(())
}

/// The media URL of the first element matching `selector`.
pub async fn read_source(page: &Page, selector: &str) -> Result<String> {
    let js = format!(
        r#"(() => {{
            const el = document.querySelector({});
            if (!el) return null;
            return el.currentSrc || el.src || el.getAttribute('src') || '';
        }})()"#,
        js_string(selector)
    );
    let src: Option<String> = page.evaluate(&js).await?;
    match src {
        None => Err(Error::ElementNotFound(format!("'{}' not found", selector))),
        Some(s) if s.is_empty() => Err(Error::ElementNotFound(format!(
            "'{}' has no source URL",
            selector
        ))),
        Some(s) => Ok(s),
    }
}

pub async fn select_option(page: &Page, selector: &str, value: &str) -> Result<()> {
    let js = format!(
        r#"(() => {{
            const sel = document.querySelector({sel});
            if (!sel) return 'element_not_found';
            const opt = Array.from(sel.options).find(o => o.value === {val} || o.text === {val});
            if (!opt) return 'option_not_found';
            sel.value = opt.value;
            sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';
        }})()"#,
        sel = js_string(selector),
        val = js_string(value)
    );
    let result: String = page.evaluate(&js).await?;
    match result.as_str() {
        "ok" => Ok(()),
        "element_not_found" => Err(Error::ElementNotFound(format!(
            "select element '{}' not found",
            selector
        ))),
        "option_not_found" => Err(Error::ActionFailed(format!(
            "option '{}' not found in select",
            value
        ))),
        _ => Err(Error::ActionFailed(format!("select failed: {}", result))),
    }
}

/// Hand a local file to an `<input type="file">`, as if picked in the
/// native file chooser.
pub async fn set_input_file(page: &Page, selector: &str, path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".into());
    debug!("set_input_file: {} ({} bytes) -> {}", name, bytes.len(), selector);

    let js = format!(
        r#"(() => {{
            const input = document.querySelector({sel});
            if (!input) return 'element_not_found';
            if (input.type !== 'file') return 'not_file_input';
            const bin = atob({data});
            const buf = new Uint8Array(bin.length);
            for (let i = 0; i < bin.length; i++) buf[i] = bin.charCodeAt(i);
            const dt = new DataTransfer();
            dt.items.add(new File([buf], {name}, {{ type: {mime} }}));
            input.files = dt.files;
            input.dispatchEvent(new Event('input', {{ bubbles: true }}));
            input.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return 'ok';
        }})()"#,
        sel = js_string(selector),
        data = js_string(&BASE64.encode(&bytes)),
        name = js_string(&name),
        mime = js_string(mime_type(path)),
    );
    let result: String = page.evaluate(&js).await?;
    match result.as_str() {
        "ok" => Ok(()),
        "element_not_found" => Err(Error::ElementNotFound(format!(
            "file input '{}' not found",
            selector
        ))),
        "not_file_input" => Err(Error::ActionFailed(format!(
            "'{}' is not a file input",
            selector
        ))),
        _ => Err(Error::ActionFailed(format!("upload failed: {}", result))),
    }
}

/// State of a page fetch as reported by the page.
#[derive(Debug, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
enum FetchState {
    Pending,
    Done { data: String },
    Error { error: String },
}

/// Download `url` from inside the page, so the session's cookies apply and
/// `data:` and `blob:` URLs resolve the way the page sees them.
///
/// The fetch runs in the background of the page and is polled until it
/// settles or `timeout` elapses.
pub async fn fetch_bytes(page: &Page, url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let key = FETCH_SEQ.fetch_add(1, Ordering::Relaxed);
    debug!("page fetch #{}: {}", key, url);

    let start = format!(
        r#"(() => {{
            const slot = (window.{slot} = window.{slot} || {{}});
            const key = {key};
            const url = {url};
            slot[key] = {{ state: 'pending' }};
            let credentials = 'omit';
            try {{
                if (new URL(url, location.href).origin === location.origin) credentials = 'include';
            }} catch (e) {{}}
            fetch(url, {{ credentials }})
                .then(r => {{
                    if (!r.ok) throw new Error('HTTP ' + r.status);
                    return r.blob();
                }})
                .then(blob => new Promise((resolve, reject) => {{
                    const reader = new FileReader();
                    reader.onload = () => resolve(reader.result);
                    reader.onerror = () => reject(reader.error);
                    reader.readAsDataURL(blob);
                }}))
                .then(dataUrl => {{
                    const comma = dataUrl.indexOf(',');
                    slot[key] = {{ state: 'done', data: comma >= 0 ? dataUrl.slice(comma + 1) : '' }};
                }})
                .catch(e => {{
                    slot[key] = {{ state: 'error', error: String((e && e.message) || e) }};
                }});
            return true;
        }})()"#,
        slot = FETCH_SLOT,
        key = key,
        url = js_string(url),
    );
    let _: bool = page.evaluate(&start).await?;

    let poll = format!(
        r#"(() => {{
            const slot = window.{slot} || {{}};
            const state = slot[{key}];
            if (!state) return JSON.stringify({{ state: 'error', error: 'fetch state lost' }});
            if (state.state !== 'pending') delete slot[{key}];
            return JSON.stringify(state);
        }})()"#,
        slot = FETCH_SLOT,
        key = key,
    );
    let deadline = Instant::now() + timeout;
    loop {
        let json: String = page.evaluate(&poll).await?;
        if let Some(bytes) = decode_fetch_state(url, &json)? {
            debug!("page fetch #{}: {} bytes", key, bytes.len());
            return Ok(bytes);
        }
        if Instant::now() >= deadline {
            return Err(Error::Timeout(format!(
                "download of {} did not finish within {}s",
                url,
                timeout.as_secs()
            )));
        }
        page.wait(POLL_INTERVAL_MS).await;
    }
}

/// Decode a polled fetch state; `None` while the fetch is still running.
fn decode_fetch_state(url: &str, json: &str) -> Result<Option<Vec<u8>>> {
    let state: FetchState = serde_json::from_str(json)
        .map_err(|e| Error::Download(format!("{}: unreadable fetch state: {}", url, e)))?;
    match state {
        FetchState::Pending => Ok(None),
        FetchState::Error { error } => Err(Error::Download(format!("{}: {}", url, error))),
        FetchState::Done { data } => {
            let bytes = BASE64
                .decode(data.as_bytes())
                .map_err(|e| Error::Download(format!("{}: invalid body encoding: {}", url, e)))?;
            if bytes.is_empty() {
                return Err(Error::Download(format!("{} returned an empty body", url)));
            }
            Ok(Some(bytes))
        }
    }
}

/// Whether `url` can also be fetched outside the page.
pub fn is_network_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string(r#"input[name="email"]"#),
            r#""input[name=\"email\"]""#
        );
        assert_eq!(js_string("it's"), r#""it's""#);
    }

    #[test]
    fn test_decode_fetch_state() {
        let url = "blob:https://leonardo.ai/3f1c";
        assert!(decode_fetch_state(url, r#"{"state":"pending"}"#)
            .unwrap()
            .is_none());

        let done = format!(r#"{{"state":"done","data":"{}"}}"#, BASE64.encode(b"\x89PNG"));
        assert_eq!(
            decode_fetch_state(url, &done).unwrap(),
            Some(b"\x89PNG".to_vec())
        );

        let err = decode_fetch_state(url, r#"{"state":"error","error":"HTTP 403"}"#).unwrap_err();
        assert!(matches!(err, Error::Download(_)));
        assert!(err.to_string().contains("HTTP 403"), "{}", err);
        assert!(err.to_string().contains(url), "{}", err);

        let empty = decode_fetch_state(url, r#"{"state":"done","data":""}"#).unwrap_err();
        assert!(empty.to_string().contains("empty body"), "{}", empty);

        assert!(decode_fetch_state(url, r#"{"state":"done","data":"%%%"}"#).is_err());
        assert!(decode_fetch_state(url, "null").is_err());
    }

    #[test]
    fn test_is_network_url() {
        assert!(is_network_url("https://cdn.leonardo.ai/users/x/image.png"));
        assert!(is_network_url("HTTP://example.com/a.mp4"));
        assert!(!is_network_url("data:image/png;base64,iVBORw0KGgo="));
        assert!(!is_network_url("blob:https://leonardo.ai/3f1c-uuid"));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(mime_type(Path::new("out/generated_anime.png")), "image/png");
        assert_eq!(mime_type(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_type(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(mime_type(Path::new("noext")), "application/octet-stream");
    }
}
