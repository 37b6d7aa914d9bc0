use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::resolve::Resolve;

/// Providers available to the process, keyed by provider id.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: BTreeMap<String, Arc<dyn Resolve + Send + Sync>>,
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverRegistry")
            .field("providers", &self.resolvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResolverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `resolver` under `id`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, id: &str, resolver: impl Resolve + Send + Sync + 'static) -> Self {
        self.resolvers.insert(id.to_owned(), Arc::new(resolver));
        self
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&(dyn Resolve + Send + Sync)> {
        self.resolvers.get(id).map(Arc::as_ref)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }
}
