//! Content loading for the file/URL/template type tags.

use super::error::{MappingError, MappingResult};
use crate::traits::{FileSystem, HttpClient};
use handlebars::Handlebars;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Where a content-tag value is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Script text given directly, recognised by a leading `#`
    Inline(String),
    /// An `http://` or `https://` URL
    Url(String),
    /// A local file path
    File(PathBuf),
}

impl ContentSource {
    pub fn classify(raw: &str) -> Self {
        if raw.starts_with('#') {
            return ContentSource::Inline(raw.to_string());
        }

        if let Ok(url) = Url::parse(raw) {
            if matches!(url.scheme(), "http" | "https") {
                return ContentSource::Url(raw.to_string());
            }
        }

        ContentSource::File(PathBuf::from(raw))
    }
}

/// Collaborators and per-invocation state used while coercing values.
///
/// Template-render failures do not abort coercion; they are recorded here so
/// the caller can surface them next to the result.
pub struct CoercionContext {
    fs: Arc<dyn FileSystem>,
    http: Arc<dyn HttpClient>,
    http_timeout: Duration,
    template_data: Option<Value>,
    warnings: Vec<String>,
}

impl CoercionContext {
    pub fn new(fs: Arc<dyn FileSystem>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            fs,
            http,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            template_data: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Data object that user-data and template content is rendered against
    pub fn with_template_data(mut self, data: Value) -> Self {
        self.template_data = Some(data);
        self
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Read the bytes behind `raw`
    pub fn load(&self, raw: &str) -> MappingResult<Vec<u8>> {
        match ContentSource::classify(raw) {
            ContentSource::Inline(text) => Ok(text.into_bytes()),
            ContentSource::Url(url) => {
                debug!(url = %url, timeout = ?self.http_timeout, "fetching remote content");
                self.http
                    .get(&url, self.http_timeout)
                    .map_err(|e| content_error(raw, e))
            }
            ContentSource::File(path) => self.fs.read(&path).map_err(|e| content_error(raw, e)),
        }
    }

    /// Render `content` as a Handlebars template against the template data.
    ///
    /// Without template data, or when rendering fails, the raw content is
    /// returned; failures are recorded as warnings.
    pub fn render(&mut self, source: &str, content: Vec<u8>) -> Vec<u8> {
        let Some(data) = self.template_data.as_ref() else {
            return content;
        };

        let text = match String::from_utf8(content) {
            Ok(text) => text,
            Err(e) => {
                self.warn(format!(
                    "'{}' is not UTF-8 text, using it without template rendering",
                    source
                ));
                return e.into_bytes();
            }
        };

        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);

        match handlebars.render_template(&text, data) {
            Ok(rendered) => rendered.into_bytes(),
            Err(e) => {
                self.warn(format!(
                    "template rendering of '{}' failed, using raw content: {}",
                    source, e
                ));
                text.into_bytes()
            }
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

fn content_error(raw: &str, e: anyhow::Error) -> MappingError {
    MappingError::Content {
        source_ref: raw.to_string(),
        message: format!("{:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockFileSystem, MockHttpClient};
    use serde_json::json;

    fn context(fs: MockFileSystem, http: MockHttpClient) -> CoercionContext {
        CoercionContext::new(Arc::new(fs), Arc::new(http))
    }

    #[test]
    fn test_classify_sources() {
        assert_eq!(
            ContentSource::classify("#!/bin/bash\necho"),
            ContentSource::Inline("#!/bin/bash\necho".to_string())
        );
        assert_eq!(
            ContentSource::classify("https://example.com/boot.sh"),
            ContentSource::Url("https://example.com/boot.sh".to_string())
        );
        assert_eq!(
            ContentSource::classify("./boot.sh"),
            ContentSource::File(PathBuf::from("./boot.sh"))
        );
        assert_eq!(
            ContentSource::classify("C:/scripts/boot.sh"),
            ContentSource::File(PathBuf::from("C:/scripts/boot.sh"))
        );
    }

    #[test]
    fn test_load_from_file_and_url() {
        let fs = MockFileSystem::new().with_file("/srv/boot.sh", "echo file");
        let http = MockHttpClient::new().with_response("https://example.com/boot.sh", 200, "echo url");
        let ctx = context(fs, http);

        assert_eq!(ctx.load("/srv/boot.sh").unwrap(), b"echo file".to_vec());
        assert_eq!(
            ctx.load("https://example.com/boot.sh").unwrap(),
            b"echo url".to_vec()
        );
    }

    #[test]
    fn test_url_fetch_uses_configured_timeout() {
        let http = Arc::new(
            MockHttpClient::new().with_response("https://example.com/boot.sh", 200, "echo url"),
        );
        let url = "https://example.com/boot.sh".to_string();

        let ctx = CoercionContext::new(Arc::new(MockFileSystem::new()), http.clone());
        ctx.load(&url).unwrap();
        let ctx = ctx.with_http_timeout(Duration::from_secs(3));
        ctx.load(&url).unwrap();

        assert_eq!(
            http.requests(),
            vec![(url.clone(), DEFAULT_HTTP_TIMEOUT), (url, Duration::from_secs(3))]
        );
    }

    #[test]
    fn test_load_errors_name_the_source() {
        let http = MockHttpClient::new().with_response("https://example.com/gone", 500, "");
        let ctx = context(MockFileSystem::new(), http);

        let err = ctx.load("https://example.com/gone").unwrap_err();
        assert!(err.to_string().contains("https://example.com/gone"));
        assert!(err.to_string().contains("500"));

        let err = ctx.load("/missing.sh").unwrap_err();
        assert!(err.to_string().contains("/missing.sh"));
    }

    #[test]
    fn test_render_without_data_returns_raw() {
        let mut ctx = context(MockFileSystem::new(), MockHttpClient::new());

        let out = ctx.render("inline", b"hello {{name}}".to_vec());
        assert_eq!(out, b"hello {{name}}".to_vec());
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_render_with_data_does_not_escape() {
        let mut ctx = context(MockFileSystem::new(), MockHttpClient::new())
            .with_template_data(json!({"name": "<web & db>"}));

        let out = ctx.render("inline", b"hello {{name}}".to_vec());
        assert_eq!(String::from_utf8(out).unwrap(), "hello <web & db>");
    }

    #[test]
    fn test_render_failure_falls_back_with_warning() {
        let mut ctx = context(MockFileSystem::new(), MockHttpClient::new())
            .with_template_data(json!({"name": "web"}));

        let out = ctx.render("boot.sh", b"hello {{#if name}}".to_vec());
        assert_eq!(out, b"hello {{#if name}}".to_vec());
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx.warnings()[0].contains("boot.sh"));

        assert_eq!(ctx.take_warnings().len(), 1);
        assert!(ctx.warnings().is_empty());
    }
}
