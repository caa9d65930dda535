//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forward proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, public scheme).
    pub listener: ListenerConfig,

    /// Outbound fetch settings.
    pub upstream: UpstreamConfig,

    /// HTML rewriting settings.
    pub rewrite: RewriteConfig,

    /// Server-side timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Client application shell.
    pub static_files: StaticConfig,

    /// Address-bar suggestions.
    pub autocomplete: AutocompleteConfig,

    /// Real-time session settings.
    pub realtime: RealtimeConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Scheme the proxy is reached through when no `X-Forwarded-Proto` is sent.
    pub public_scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            public_scheme: "http".to_string(),
        }
    }
}

impl ListenerConfig {
    /// Replace the port of the bind address, keeping the host part.
    pub fn override_port(&mut self, port: u16) {
        let host = match self.bind_address.rsplit_once(':') {
            Some((host, _)) => host.to_string(),
            None => self.bind_address.clone(),
        };
        self.bind_address = format!("{}:{}", host, port);
    }
}

/// Settings for fetching remote pages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Whole-fetch deadline in seconds.
    pub timeout_secs: u64,

    /// Browser User-Agent presented to target sites.
    pub user_agent: String,

    /// Accept header.
    pub accept: String,

    /// Accept-Language header.
    pub accept_language: String,

    /// Maximum redirects followed before the fetch fails.
    pub max_redirects: usize,

    /// Largest remote body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
            max_redirects: 10,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// HTML rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Inject the navigation-interception script into proxied pages.
    pub inject_bootstrap: bool,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            inject_bootstrap: true,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Location of the browser client shell.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory served for unmatched routes.
    pub root: String,

    /// Shell document inside `root`, also served for 404s.
    pub index: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
            index: "index.html".to_string(),
        }
    }
}

/// Address-bar suggestion source.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    pub suggestions: Vec<String>,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            suggestions: vec![
                "https://www.google.com".to_string(),
                "https://www.youtube.com".to_string(),
                "https://www.github.com".to_string(),
                "https://www.stackoverflow.com".to_string(),
            ],
        }
    }
}

/// Real-time channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Outbound messages queued per session before it is dropped as lagging.
    pub session_queue: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self { session_queue: 64 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str("[upstream]\ntimeout_secs = 3\n").unwrap();
        assert_eq!(config.upstream.timeout_secs, 3);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert!(config.rewrite.inject_bootstrap);
        assert_eq!(config.autocomplete.suggestions.len(), 4);
        assert_eq!(config.upstream.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.realtime.session_queue, 64);
    }

    #[test]
    fn test_override_port() {
        let mut listener = ListenerConfig::default();
        listener.override_port(8080);
        assert_eq!(listener.bind_address, "0.0.0.0:8080");
    }
}
