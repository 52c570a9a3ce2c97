//! Console configuration loaded via OrthoConfig.
//!
//! Every value is optional; accessors apply the defaults. Values come from
//! `FLEET_CONSOLE_*` environment variables or a configuration file.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::http_failure::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE, RetryPolicy};
use crate::domain::token_refresh::{DEFAULT_MIN_VALIDITY, DEFAULT_REFRESH_INTERVAL};
use crate::domain::{
    NotificationDurations, RoutePath, RoutePathValidationError, TokenRefreshPolicy,
};

const DEFAULT_GRAPHQL_ENDPOINT: &str = "http://localhost:8080/graphql";
const DEFAULT_DOCUMENTS_DIR: &str = "graphql";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_FALLBACK_ROUTE: &str = "/dashboard";

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The GraphQL endpoint is not a URL.
    #[error("invalid graphql endpoint '{value}': {source}")]
    Endpoint {
        /// Configured value.
        value: String,
        /// Parse failure.
        source: url::ParseError,
    },
    /// The fallback route is not an absolute path.
    #[error("invalid fallback route '{value}': {source}")]
    FallbackRoute {
        /// Configured value.
        value: String,
        /// Validation failure.
        source: RoutePathValidationError,
    },
}

/// Settings for the console core and its transport.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "FLEET_CONSOLE")]
pub struct ConsoleSettings {
    /// GraphQL endpoint URL.
    pub graphql_endpoint: Option<String>,
    /// Directory holding `<field>.graphql` documents.
    pub documents_dir: Option<PathBuf>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Retries after the first attempt for transient failures.
    pub retry_count: Option<u32>,
    /// Base of the linear retry backoff in milliseconds.
    pub retry_backoff_ms: Option<u64>,
    /// Route unauthorised navigation is redirected to.
    pub fallback_route: Option<String>,
    /// Seconds between token refresh checks.
    pub token_refresh_interval_secs: Option<u64>,
    /// Seconds of validity a token must keep before it is refreshed.
    pub token_min_validity_secs: Option<u64>,
    /// Display time of success notifications in milliseconds.
    pub success_notification_ms: Option<u64>,
    /// Display time of info notifications in milliseconds.
    pub info_notification_ms: Option<u64>,
    /// Display time of warnings in milliseconds.
    pub warning_notification_ms: Option<u64>,
    /// Display time of error notifications in milliseconds.
    pub error_notification_ms: Option<u64>,
    /// Use the built-in development identity instead of a real provider.
    #[ortho_config(default = false)]
    pub development_identity: bool,
}

impl ConsoleSettings {
    /// GraphQL endpoint, falling back to the local default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Endpoint`] when the value is not a URL.
    pub fn graphql_endpoint(&self) -> Result<Url, ConfigError> {
        let value = self
            .graphql_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_GRAPHQL_ENDPOINT);
        Url::parse(value).map_err(|source| ConfigError::Endpoint {
            value: value.to_owned(),
            source,
        })
    }

    /// Documents directory, falling back to `./graphql`.
    pub fn documents_dir(&self) -> PathBuf {
        self.documents_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCUMENTS_DIR))
    }

    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_ms
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_millis)
    }

    /// Retry policy for transient transport failures.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_count.unwrap_or(DEFAULT_MAX_RETRIES),
            base_delay: self
                .retry_backoff_ms
                .map_or(DEFAULT_RETRY_BASE, Duration::from_millis),
        }
    }

    /// Fallback route for the route guard.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FallbackRoute`] when the value is not an
    /// absolute path.
    pub fn fallback_route(&self) -> Result<RoutePath, ConfigError> {
        let value = self
            .fallback_route
            .as_deref()
            .unwrap_or(DEFAULT_FALLBACK_ROUTE);
        RoutePath::new(value).map_err(|source| ConfigError::FallbackRoute {
            value: value.to_owned(),
            source,
        })
    }

    /// Token refresh cadence.
    pub fn token_refresh_policy(&self) -> TokenRefreshPolicy {
        TokenRefreshPolicy {
            interval: self
                .token_refresh_interval_secs
                .map_or(DEFAULT_REFRESH_INTERVAL, Duration::from_secs),
            min_validity: self
                .token_min_validity_secs
                .map_or(DEFAULT_MIN_VALIDITY, Duration::from_secs),
        }
    }

    /// Per-severity notification display times.
    pub fn notification_durations(&self) -> NotificationDurations {
        let defaults = NotificationDurations::default();
        let pick = |configured: Option<u64>, default: Duration| {
            configured.map_or(default, Duration::from_millis)
        };
        NotificationDurations {
            success: pick(self.success_notification_ms, defaults.success),
            info: pick(self.info_notification_ms, defaults.info),
            warning: pick(self.warning_notification_ms, defaults.warning),
            error: pick(self.error_notification_ms, defaults.error),
        }
    }
}
