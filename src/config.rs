use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the v3 services, e.g. `http://127.0.0.1:8080`
    pub base_url: String,
    /// Deadline for one v3 call; expiry is reported as a transport error
    #[serde(with = "duration_string")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub verbose: bool,
    pub quiet: bool,
    /// Explicit `EnvFilter` directives, e.g. `"v2_compat_gateway=trace,warn"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Filter directives for this configuration
    ///
    /// `quiet` wins over an explicit `filter`, which wins over `verbose`.
    pub fn directives(&self) -> String {
        if self.quiet {
            "error".to_string()
        } else if let Some(filter) = &self.filter {
            filter.clone()
        } else if self.verbose {
            "v2_compat_gateway=debug,tower_http=debug,info".to_string()
        } else {
            "v2_compat_gateway=info,warn".to_string()
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            upstream: UpstreamConfig {
                base_url: "http://127.0.0.1:9000".to_string(),
                request_timeout: Duration::from_secs(30),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Defaults, or the given file, then environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values serde cannot check on its own
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.upstream_url()?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "upstream base_url must be http or https, got {}",
            url.scheme()
        );
        anyhow::ensure!(
            !self.upstream.request_timeout.is_zero(),
            "upstream request_timeout must be positive"
        );
        if let Some(filter) = &self.logging.filter {
            EnvFilter::try_new(filter)
                .map_err(|e| anyhow::anyhow!("invalid logging filter {filter:?}: {e}"))?;
        }
        Ok(())
    }

    /// Parsed upstream base URL
    pub fn upstream_url(&self) -> anyhow::Result<Url> {
        Ok(Url::parse(&self.upstream.base_url)?)
    }

    /// Override fields from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("V2GW_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("V2GW_PORT") {
            self.server.port = port.parse()?;
        }
        if let Some(url) = lookup("V2GW_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(timeout) = lookup("V2GW_UPSTREAM_TIMEOUT") {
            self.upstream.request_timeout = duration_string::parse(&timeout)?;
        }
        if let Some(filter) = lookup("V2GW_LOG_FILTER") {
            self.logging.filter = Some(filter);
        }
        Ok(())
    }
}

// Helper module for duration serialization
mod duration_string {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn parse(s: &str) -> anyhow::Result<Duration> {
        match s.strip_suffix('s') {
            Some(stripped) => Ok(Duration::from_secs(stripped.parse()?)),
            None => anyhow::bail!("Expected duration string ending with 's', got {s:?}"),
        }
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = format!("{}s", duration.as_secs());
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }
}
