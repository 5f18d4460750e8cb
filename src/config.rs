//! Startup configuration, read once from the environment.
//!
//! Every optional integration resolves to an enabled or disabled variant here so
//! the rest of the service never re-reads environment variables.

use std::env;
use tracing::{info, warn};

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const APPWRITE_ENDPOINT: &str = "https://fra.cloud.appwrite.io/v1";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub proxy: ProxyConfig,
    pub metadata: MetadataConfig,
    pub store: StoreConfig,
}

/// Server side of the TMDB proxy.
#[derive(Debug, Clone)]
pub enum ProxyConfig {
    Enabled { bearer: String, upstream: String },
    /// No secret configured; every proxied request gets a fixed 500.
    Disabled,
}

/// How this process itself reaches TMDB.
#[derive(Debug, Clone)]
pub enum MetadataConfig {
    Direct { api_key: String, base_url: String },
    Proxied { base_url: String },
    Disabled,
}

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Enabled(AppwriteConfig),
    Disabled,
}

#[derive(Debug, Clone)]
pub struct AppwriteConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count
    /// as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let upstream = get("TMDB_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| TMDB_BASE.to_string());

        let proxy = match get("TMDB_BEARER") {
            Some(bearer) => ProxyConfig::Enabled {
                bearer,
                upstream: upstream.clone(),
            },
            None => {
                warn!("TMDB_BEARER is not set; the TMDB proxy will reject requests");
                ProxyConfig::Disabled
            }
        };

        let metadata = match (get("TMDB_API_KEY"), get("TMDB_PROXY_URL")) {
            (Some(api_key), _) => MetadataConfig::Direct {
                api_key,
                base_url: upstream,
            },
            (None, Some(proxy_url)) => MetadataConfig::Proxied {
                base_url: proxy_url.trim_end_matches('/').to_string(),
            },
            (None, None) => {
                warn!("Neither TMDB_API_KEY nor TMDB_PROXY_URL is set; movie lookups are disabled");
                MetadataConfig::Disabled
            }
        };

        let store = match (
            get("APPWRITE_PROJECT_ID"),
            get("APPWRITE_DATABASE_ID"),
            get("APPWRITE_COLLECTION_ID"),
        ) {
            (Some(project_id), Some(database_id), Some(collection_id)) => {
                StoreConfig::Enabled(AppwriteConfig {
                    endpoint: get("APPWRITE_ENDPOINT")
                        .map(|e| e.trim_end_matches('/').to_string())
                        .unwrap_or_else(|| APPWRITE_ENDPOINT.to_string()),
                    project_id,
                    database_id,
                    collection_id,
                    api_key: get("APPWRITE_API_KEY"),
                })
            }
            _ => {
                warn!("Appwrite configuration is incomplete; search counting is disabled");
                StoreConfig::Disabled
            }
        };

        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!("Ignoring invalid PORT '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            port,
            proxy,
            metadata,
            store,
        }
    }

    pub fn log_summary(&self) {
        let proxy = matches!(self.proxy, ProxyConfig::Enabled { .. });
        let search_counts = matches!(self.store, StoreConfig::Enabled(_));
        info!(
            port = self.port,
            proxy,
            metadata = self.metadata.mode(),
            search_counts,
            "Configuration loaded"
        );
    }
}

impl MetadataConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            MetadataConfig::Direct { .. } => "direct",
            MetadataConfig::Proxied { .. } => "proxied",
            MetadataConfig::Disabled => "disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn empty_environment_disables_everything() {
        let cfg = config(&[]);
        assert!(matches!(cfg.proxy, ProxyConfig::Disabled));
        assert!(matches!(cfg.metadata, MetadataConfig::Disabled));
        assert!(matches!(cfg.store, StoreConfig::Disabled));
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let cfg = config(&[("TMDB_BEARER", "   ")]);
        assert!(matches!(cfg.proxy, ProxyConfig::Disabled));
    }

    #[test]
    fn direct_key_wins_over_proxy_url() {
        let cfg = config(&[
            ("TMDB_API_KEY", "key"),
            ("TMDB_PROXY_URL", "http://localhost:3000/api/tmdb/"),
        ]);
        match cfg.metadata {
            MetadataConfig::Direct { api_key, base_url } => {
                assert_eq!(api_key, "key");
                assert_eq!(base_url, TMDB_BASE);
            }
            other => panic!("unexpected metadata config {:?}", other),
        }
    }

    #[test]
    fn proxy_url_is_trimmed() {
        let cfg = config(&[("TMDB_PROXY_URL", "http://localhost:3000/api/tmdb/")]);
        match cfg.metadata {
            MetadataConfig::Proxied { base_url } => {
                assert_eq!(base_url, "http://localhost:3000/api/tmdb")
            }
            other => panic!("unexpected metadata config {:?}", other),
        }
    }

    #[test]
    fn partial_store_config_is_disabled() {
        let cfg = config(&[
            ("APPWRITE_PROJECT_ID", "p"),
            ("APPWRITE_DATABASE_ID", "d"),
        ]);
        assert!(matches!(cfg.store, StoreConfig::Disabled));
    }

    #[test]
    fn complete_store_config_uses_default_endpoint() {
        let cfg = config(&[
            ("APPWRITE_PROJECT_ID", "p"),
            ("APPWRITE_DATABASE_ID", "d"),
            ("APPWRITE_COLLECTION_ID", "c"),
            ("PORT", "8081"),
        ]);
        match cfg.store {
            StoreConfig::Enabled(a) => {
                assert_eq!(a.endpoint, APPWRITE_ENDPOINT);
                assert_eq!(a.collection_id, "c");
                assert!(a.api_key.is_none());
            }
            StoreConfig::Disabled => panic!("store should be enabled"),
        }
        assert_eq!(cfg.port, 8081);
    }
}
