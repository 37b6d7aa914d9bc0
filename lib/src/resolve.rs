mod provider;
mod registry;

use anyhow::Result;

use crate::config::Settings;
use crate::host::HostRecord;

pub use provider::inventory::InventoryResolver;
pub use provider::default_registry;
pub use registry::ResolverRegistry;

/// A source of [`HostRecord`]s, such as a cloud platform.
pub trait Resolve {
    /// Finds the hosts that `name` designates, in the provider's own order.
    ///
    /// An empty list is a valid answer and is distinct from an error.
    ///
    /// # Errors
    ///
    /// If the provider could not be queried or its settings are unusable.
    fn resolve(&self, name: &str, settings: &Settings) -> Result<Vec<HostRecord>>;
}
