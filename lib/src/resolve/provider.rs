pub mod inventory;

use self::inventory::InventoryResolver;
use crate::resolve::ResolverRegistry;

/// Creates the registry of providers shipped with `hssh`.
#[must_use]
pub fn default_registry() -> ResolverRegistry {
    ResolverRegistry::new().with(InventoryResolver::ID, InventoryResolver::default())
}
