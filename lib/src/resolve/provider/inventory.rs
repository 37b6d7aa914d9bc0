use anyhow::Context;
use anyhow::Result;
use tracing::debug;

use crate::config::Settings;
use crate::host::HostRecord;
use crate::resolve::Resolve;

/// Resolves names against hosts listed in the configuration file.
///
/// ```toml
/// [[providers.inventory.hosts]]
/// id = "i-0a1b"
/// instance_name = "db-1"
/// public_ipv4 = "203.0.113.7"
/// tags = { role = "database" }
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryResolver {}

impl InventoryResolver {
    pub const ID: &'static str = "inventory";

    /// # Errors
    ///
    /// If the `hosts` key exists but is not a list of host tables.
    pub fn hosts(settings: &Settings) -> Result<Vec<HostRecord>> {
        let Some(value) = settings
            .provider_settings(Self::ID)
            .and_then(|provider| provider.extra.get("hosts"))
        else {
            return Ok(Vec::new());
        };
        let mut hosts: Vec<HostRecord> = value
            .clone()
            .try_into()
            .context("providers.inventory.hosts must be a list of hosts")?;
        for host in &mut hosts {
            if host.provider.is_empty() {
                Self::ID.clone_into(&mut host.provider);
            }
        }
        Ok(hosts)
    }
}

impl Resolve for InventoryResolver {
    fn resolve(&self, name: &str, settings: &Settings) -> Result<Vec<HostRecord>> {
        let hosts: Vec<HostRecord> = Self::hosts(settings)?
            .into_iter()
            .filter(|host| host.answers_to(name))
            .collect();
        debug!(name, count = hosts.len(), "InventoryResolver: resolved");
        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const INVENTORY: &str = r#"
[[providers.inventory.hosts]]
id = "i-1"
instance_name = "db-1"
public_ipv4 = "10.0.0.5"

[[providers.inventory.hosts]]
id = "i-2"
instance_name = "web"
zone = "eu-west-1a"
tags = { cluster = "front" }

[[providers.inventory.hosts]]
id = "i-3"
instance_name = "web"
zone = "eu-west-1b"
tags = { cluster = "front" }
"#;

    #[rstest]
    #[case("db-1", &["i-1"])]
    #[case("i-2", &["i-2"])]
    #[case("web", &["i-2", "i-3"])]
    #[case("front", &["i-2", "i-3"])]
    #[case("nope", &[])]
    fn resolve_works(#[case] name: &str, #[case] expected: &[&str]) {
        let settings = Settings::from_toml(INVENTORY).unwrap();
        let hosts = InventoryResolver::default().resolve(name, &settings).unwrap();
        let ids: Vec<&str> = hosts.iter().map(|host| host.id.as_str()).collect();
        assert_eq!(ids, expected);
        assert!(hosts.iter().all(|host| host.provider == "inventory"));
    }

    #[test]
    fn resolve_without_hosts_is_empty() {
        let hosts = InventoryResolver::default()
            .resolve("db-1", &Settings::default())
            .unwrap();
        assert!(hosts.is_empty());
    }

    #[test]
    fn resolve_rejects_malformed_hosts() {
        let settings = Settings::from_toml("[providers.inventory]\nhosts = 3\n").unwrap();
        assert!(InventoryResolver::default().resolve("db-1", &settings).is_err());
    }
}
