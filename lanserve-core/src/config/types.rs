//! Configuration type definitions
//!
//! These types represent the immutable runtime configuration for Lanserve.
//! Values are set once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for Lanserve
///
/// The serving root is derived from the location of the configuration file
/// rather than stored in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Host to bind (all interfaces by default)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log file name, resolved against the serving root
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Maximum request size in bytes (default: 1MB)
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,

    /// Per-request read timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bounded wait for in-flight work during shutdown, in seconds
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Index file served in place of directory listings
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Open the site in the default browser after startup
    #[serde(default = "default_bool_true")]
    pub open_browser: bool,

    /// Security header configuration
    #[serde(default)]
    pub security: SecurityConfig,

    /// Serving root: the directory containing this configuration file
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_file: default_log_file(),
            max_request_size: default_max_request_size(),
            request_timeout_secs: default_request_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
            index_file: default_index_file(),
            open_browser: default_bool_true(),
            security: SecurityConfig::default(),
            root: PathBuf::from("."),
        }
    }
}

impl ServeConfig {
    /// Address string the listener binds to
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed socket address
    pub fn bind_addr(&self) -> crate::Result<SocketAddr> {
        self.address().parse().map_err(|e| {
            crate::Error::Config(format!("Invalid bind address {}: {}", self.address(), e))
        })
    }

    /// Log file path, co-located with the serving root
    pub fn log_path(&self) -> PathBuf {
        self.root.join(&self.log_file)
    }

    /// Per-request read timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Bounded wait applied to the accept-loop join during shutdown
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Security header configuration
///
/// The allowlists mirror the external origins the served site actually
/// references, so they are configuration rather than constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Value of the `Server` response header
    #[serde(default = "default_server_id")]
    pub server_id: String,

    /// Allowed external stylesheet origins
    #[serde(default = "default_style_src")]
    pub style_src: Vec<String>,

    /// Allowed external font origins
    #[serde(default = "default_font_src")]
    pub font_src: Vec<String>,

    /// Permit inline style attributes and tags
    #[serde(default = "default_bool_true")]
    pub allow_inline_styles: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            server_id: default_server_id(),
            style_src: default_style_src(),
            font_src: default_font_src(),
            allow_inline_styles: default_bool_true(),
        }
    }
}

impl SecurityConfig {
    /// Render the `Content-Security-Policy` header value
    ///
    /// Sources are restricted to self plus the configured origins; images
    /// additionally allow `data:` URIs.
    pub fn content_security_policy(&self) -> String {
        let mut style = String::from("'self'");
        if self.allow_inline_styles {
            style.push_str(" 'unsafe-inline'");
        }
        for origin in &self.style_src {
            style.push(' ');
            style.push_str(origin);
        }

        let mut font = String::from("'self'");
        for origin in &self.font_src {
            font.push(' ');
            font.push_str(origin);
        }

        format!(
            "default-src 'self'; img-src 'self' data:; style-src {}; font-src {};",
            style, font
        )
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_file() -> String {
    "server.log".to_string()
}

fn default_max_request_size() -> usize {
    1024 * 1024 // 1MB
}

fn default_request_timeout() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_index_file() -> String {
    "index.html".to_string()
}

fn default_bool_true() -> bool {
    true
}

fn default_server_id() -> String {
    "lanserve".to_string()
}

fn default_style_src() -> Vec<String> {
    vec!["https://cdnjs.cloudflare.com".to_string()]
}

fn default_font_src() -> Vec<String> {
    vec![
        "https://fonts.googleapis.com".to_string(),
        "https://fonts.gstatic.com".to_string(),
        "https://cdnjs.cloudflare.com".to_string(),
    ]
}
