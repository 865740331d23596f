//! Client configuration.

use url::Url;

/// Where the engine's API lives.
///
/// The base URL is injected once at session construction instead of being
/// reconstructed from ambient state, so independent sessions against
/// different engines can coexist in one process.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: Url,
}

impl ClientConfig {
    /// Create a configuration from the engine's API base URL,
    /// e.g. `https://host/backup/api/`.
    pub fn new(mut base_url: Url) -> Self {
        // Url::join drops the last path segment unless the base ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        ClientConfig { base_url }
    }

    /// The fixed-port development engine (`http://localhost:12345/fixed/`).
    pub fn fixed_port_dev() -> Self {
        ClientConfig::new(Url::parse("http://localhost:12345/fixed/api/").expect("static URL"))
    }

    /// The configured API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint name against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    /// The string a request signature binds the endpoint under: the base
    /// URL's path followed by the endpoint name.
    pub(crate) fn signing_path(&self, path: &str) -> String {
        format!("{}{}", self.base_url.path(), path)
    }
}
