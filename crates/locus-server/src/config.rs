//! Environment configuration for the server binary

use std::{env, fmt::Display, str::FromStr};

use locus_client::ProviderRouter;
use locus_core::{EngineConfig, LocusError, Provider, ProviderSettings};
use tracing::{info, warn};

pub const OTEL_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

pub struct ServerConfig {
    pub port: u16,
    pub redis_url: Option<String>,
    pub engine: EngineConfig,
}

impl ServerConfig {
    pub fn load() -> Result<Self, LocusError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LocusError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = EngineConfig::default();

        let mut engine = EngineConfig {
            provider_order: var("LOCUS_PROVIDER_ORDER")
                .map(|list| ProviderRouter::parse(&list).order().to_vec())
                .unwrap_or(defaults.provider_order.clone()),
            cache_ttl_secs: try_load(&var, "LOCUS_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
            provider_timeout_ms: try_load(
                &var,
                "LOCUS_PROVIDER_TIMEOUT_MS",
                defaults.provider_timeout_ms,
            )?,
            ..defaults
        };

        let providers = [
            (Provider::Foursquare, "FOURSQUARE_API_KEY", "FOURSQUARE_RPM"),
            (Provider::Google, "GOOGLE_PLACES_API_KEY", "GOOGLE_PLACES_RPM"),
        ];
        for (provider, key_var, rpm_var) in providers {
            match var(key_var) {
                Some(api_key) => {
                    let rpm = try_load(&var, rpm_var, 60u32)?;
                    let settings = ProviderSettings::new(api_key.trim()).with_requests_per_minute(rpm);
                    info!(%provider, key_id = %settings.key_id(), rpm, "Provider enabled");
                    engine = engine.with_provider(provider, settings);
                }
                None => warn!(%provider, "{key_var} not set, provider disabled"),
            }
        }

        Ok(Self {
            port: try_load(&var, "LOCUS_PORT", 8080u16)?,
            redis_url: var("LOCUS_REDIS_URL"),
            engine,
        })
    }
}

fn try_load<T, F>(var: &F, key: &str, default: T) -> Result<T, LocusError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| LocusError::Config(format!("Invalid {key} value '{raw}': {e}"))),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
