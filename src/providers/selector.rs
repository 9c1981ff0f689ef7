use super::registry::{ProviderName, ProviderRegistry};
use super::traits::ContentProvider;
use anyhow::Result;
use std::sync::Arc;

/// Picks the active text provider for each request.
///
/// Selection is stateless and re-run per call: credentials are probed live,
/// so exporting a key mid-session changes the outcome of the next request
/// without a restart. Order of precedence: explicit mock override, then the
/// cost-ordered preference walk, then mock as the floor.
pub struct ActiveSelector {
    preference: Vec<ProviderName>,
    use_mock: bool,
}

impl ActiveSelector {
    pub fn new(preference: Vec<ProviderName>, use_mock: bool) -> Self {
        Self {
            preference,
            use_mock,
        }
    }

    pub fn use_mock(&self) -> bool {
        self.use_mock
    }

    pub fn preference(&self) -> &[ProviderName] {
        &self.preference
    }

    /// Resolve the provider that should serve the next request.
    ///
    /// Errors only when the registry is missing an entry the preference list
    /// names, which is a wiring bug caught at first use.
    pub fn active(&self, registry: &ProviderRegistry) -> Result<(ProviderName, Arc<dyn ContentProvider>)> {
        if self.use_mock {
            return Ok((ProviderName::Mock, registry.get(ProviderName::Mock)?));
        }
        for name in &self.preference {
            let provider = registry.get(*name)?;
            if provider.configured() {
                return Ok((*name, provider));
            }
        }
        tracing::debug!("No provider credentials found, serving mock content");
        Ok((ProviderName::Mock, registry.get(ProviderName::Mock)?))
    }
}
