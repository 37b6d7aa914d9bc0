use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::RegexBuilder;
use strum::EnumCount;
use strum::EnumIter;
use strum::IntoEnumIterator;
use strum::IntoStaticStr;

use crate::filter::FilterError;
use crate::host::HostRecord;

/// Filterable attributes of a [`HostRecord`].
///
/// Each variant is paired with an accessor in [`Attribute::value`], so adding
/// a field to the record without a variant here is the only way for the two to
/// drift, and the exhaustive match makes the reverse impossible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumCount, IntoStaticStr,
)]
pub enum Attribute {
    Id,
    Provider,
    Region,
    Zone,
    InstanceName,
    PrivateIpv4,
    PrivateIpv6,
    PrivateName,
    PublicIpv4,
    PublicIpv6,
    PublicName,
}

impl Attribute {
    /// Canonical attribute name, e.g. `PublicIpv4`.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub fn value(self, host: &HostRecord) -> &str {
        match self {
            Self::Id => &host.id,
            Self::Provider => &host.provider,
            Self::Region => &host.region,
            Self::Zone => &host.zone,
            Self::InstanceName => &host.instance_name,
            Self::PrivateIpv4 => &host.private_ipv4,
            Self::PrivateIpv6 => &host.private_ipv6,
            Self::PrivateName => &host.private_name,
            Self::PublicIpv4 => &host.public_ipv4,
            Self::PublicIpv6 => &host.public_ipv6,
            Self::PublicName => &host.public_name,
        }
    }
}

// Registry -------------------------------------------------------------------

/// Lowercase name to attribute, built once for the process.
static REGISTRY: LazyLock<BTreeMap<String, Attribute>> = LazyLock::new(|| {
    Attribute::iter()
        .map(|attribute| (attribute.name().to_lowercase(), attribute))
        .collect()
});

/// Whether `name` is exactly the name of a known attribute, ignoring case.
#[must_use]
pub fn is_valid_field_name(name: &str) -> bool {
    REGISTRY.contains_key(&name.to_lowercase())
}

/// Resolves a field selector into the attributes it designates.
///
/// An exact (case-insensitive) attribute name selects that attribute alone.
/// Anything else is a regular expression searched within each lowercase
/// attribute name, so `ip` selects the four address attributes. The result is
/// ordered by canonical name.
///
/// # Errors
///
/// - [`FilterError::InvalidPattern`] if the selector is not a valid regex.
/// - [`FilterError::UnknownField`] if the selector designates no attribute.
pub fn matchable_fields(selector: &str) -> Result<Vec<Attribute>, FilterError> {
    if let Some(attribute) = REGISTRY.get(&selector.to_lowercase()) {
        return Ok(vec![*attribute]);
    }

    let pattern = RegexBuilder::new(selector)
        .case_insensitive(true)
        .build()
        .map_err(|source| FilterError::InvalidPattern {
            pattern: selector.to_owned(),
            source,
        })?;

    let mut fields: Vec<Attribute> = REGISTRY
        .iter()
        .filter(|(name, _)| pattern.is_match(name))
        .map(|(_, attribute)| *attribute)
        .collect();

    if fields.is_empty() {
        return Err(FilterError::UnknownField(selector.to_owned()));
    }

    fields.sort_by_key(|attribute| attribute.name());
    Ok(fields)
}
