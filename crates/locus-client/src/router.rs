use locus_core::{EngineConfig, Provider};
use tracing::warn;

/// Decides which providers take part in a resolution and in what order of
/// preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRouter {
    order: Vec<Provider>,
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new(Provider::ALL.to_vec())
    }
}

impl ProviderRouter {
    pub fn new(order: Vec<Provider>) -> Self {
        let mut deduped = Vec::with_capacity(order.len());
        for provider in order {
            if !deduped.contains(&provider) {
                deduped.push(provider);
            }
        }
        Self { order: deduped }
    }

    /// Parses a comma separated list such as `"google,foursquare"`.
    /// Unknown names are skipped; an empty list falls back to the default order.
    pub fn parse(list: &str) -> Self {
        let order: Vec<Provider> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter_map(|name| match name.parse::<Provider>() {
                Ok(provider) => Some(provider),
                Err(err) => {
                    warn!("Invalid provider in order '{}': {}", name, err);
                    None
                }
            })
            .collect();

        if order.is_empty() {
            Self::default()
        } else {
            Self::new(order)
        }
    }

    pub fn order(&self) -> &[Provider] {
        &self.order
    }

    /// Orders `available` by preference. Providers missing from the
    /// configured order keep their relative position after the ranked ones.
    pub fn rank(&self, available: &[Provider]) -> Vec<Provider> {
        let mut ranked: Vec<Provider> = self
            .order
            .iter()
            .copied()
            .filter(|provider| available.contains(provider))
            .collect();
        for provider in available {
            if !ranked.contains(provider) {
                ranked.push(*provider);
            }
        }
        ranked
    }

    /// Providers that have settings in `config`, in preference order.
    pub fn resolve(&self, config: &EngineConfig) -> Vec<Provider> {
        let mut configured: Vec<Provider> = config.providers.keys().copied().collect();
        configured.sort();
        self.rank(&configured)
    }
}
