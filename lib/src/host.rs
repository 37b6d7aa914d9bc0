use std::collections::BTreeMap;
use std::fmt;

use bon::Builder;
use serde::Deserialize;
use serde::Serialize;

/// A resolved destination as reported by a provider.
///
/// Every attribute is a plain string, empty when the provider does not know
/// it, so that filters can treat all of them the same way. Records are never
/// modified once a resolver hands them out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
#[builder(on(String, into))]
pub struct HostRecord {
    #[builder(default)]
    pub id: String,
    #[builder(default)]
    pub provider: String,
    #[builder(default)]
    pub region: String,
    #[builder(default)]
    pub zone: String,
    #[builder(default)]
    pub instance_name: String,
    #[builder(default)]
    pub private_ipv4: String,
    #[builder(default)]
    pub private_ipv6: String,
    #[builder(default)]
    pub private_name: String,
    #[builder(default)]
    pub public_ipv4: String,
    #[builder(default)]
    pub public_ipv6: String,
    #[builder(default)]
    pub public_name: String,
    #[builder(default)]
    pub tags: BTreeMap<String, String>,
}

impl HostRecord {
    /// Publicly reachable address: IPv4, then IPv6, then DNS name.
    #[must_use]
    pub fn public_address(&self) -> Option<&str> {
        first_non_empty([&self.public_ipv4, &self.public_ipv6, &self.public_name])
    }

    /// Private address: IPv4, then IPv6, then DNS name.
    #[must_use]
    pub fn private_address(&self) -> Option<&str> {
        first_non_empty([&self.private_ipv4, &self.private_ipv6, &self.private_name])
    }

    /// Address the SSH client should connect to. Public wins over private.
    #[must_use]
    pub fn connect_address(&self) -> Option<&str> {
        self.public_address().or_else(|| self.private_address())
    }

    /// Whether `name` designates this record, either by identity or through
    /// one of its names or tag values.
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        [&self.id, &self.instance_name, &self.private_name, &self.public_name]
            .into_iter()
            .any(|value| !value.is_empty() && value == name)
            || self.tags.values().any(|value| value == name)
    }
}

impl fmt::Display for HostRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if !self.instance_name.is_empty() {
            write!(f, " ({})", self.instance_name)?;
        }
        if let Some(address) = self.connect_address() {
            write!(f, " [{address}]")?;
        }
        Ok(())
    }
}

fn first_non_empty<'a>(values: impl IntoIterator<Item = &'a String>) -> Option<&'a str> {
    values
        .into_iter()
        .map(String::as_str)
        .find(|value| !value.is_empty())
}
