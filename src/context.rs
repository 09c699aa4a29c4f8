use crate::config::Config;
use crate::mapping::CoercionContext;
use crate::traits::{
    FileSystem, HttpClient, Output, RealFileSystem, ReqwestClient, TerminalOutput,
};
use std::sync::Arc;

/// Application context that holds all dependencies for dependency injection
#[derive(Clone)]
pub struct Context {
    pub fs: Arc<dyn FileSystem>,
    pub http: Arc<dyn HttpClient>,
    pub output: Arc<dyn Output>,
    pub config: Config,
}

impl Context {
    /// Create a new context with real implementations (for production use)
    pub fn new(config: Config) -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
            http: Arc::new(ReqwestClient),
            output: Arc::new(TerminalOutput),
            config,
        }
    }

    /// Create a test context with specific mock implementations
    #[cfg(test)]
    pub fn test_with(
        fs: Arc<dyn FileSystem>,
        http: Arc<dyn HttpClient>,
        output: Arc<dyn Output>,
    ) -> Self {
        Self {
            fs,
            http,
            output,
            config: Config::default(),
        }
    }

    /// Fresh per-invocation coercion state sharing this context's collaborators
    pub fn coercion_context(&self) -> CoercionContext {
        CoercionContext::new(Arc::clone(&self.fs), Arc::clone(&self.http))
            .with_http_timeout(self.config.http_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockFileSystem, MockHttpClient, MockOutput};
    use std::time::Duration;

    #[test]
    fn test_coercion_context_uses_configured_http_timeout() {
        let http = Arc::new(MockHttpClient::new().with_response("https://example.com/a", 200, "a"));
        let mut ctx = Context::test_with(
            Arc::new(MockFileSystem::new()),
            http.clone(),
            Arc::new(MockOutput::new()),
        );
        ctx.config.http_timeout_secs = 4;

        ctx.coercion_context().load("https://example.com/a").unwrap();

        assert_eq!(
            http.requests(),
            vec![("https://example.com/a".to_string(), Duration::from_secs(4))]
        );
    }
}
