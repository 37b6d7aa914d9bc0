use std::fmt;
use std::str::FromStr;

use regex::Regex;
use thiserror::Error;
use tracing::trace;

use crate::attribute::matchable_fields;
use crate::attribute::Attribute;
use crate::host::HostRecord;

/// Reasons a filter specification is rejected.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid filter {0:?}: must be field_regexp:value_regexp")]
    Malformed(String),

    #[error("no host attribute matches field {0:?}")]
    UnknownField(String),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Predicate over [`HostRecord`]s, compiled from `field:value`.
///
/// The field part selects one or more attributes (see
/// [`matchable_fields`]); the value part is a regex searched within each of
/// them. A host matches if any selected attribute matches.
#[derive(Debug, Clone)]
pub struct Filter {
    fields: Vec<Attribute>,
    pattern: Regex,
}

impl Filter {
    /// # Errors
    ///
    /// - If `spec` does not contain exactly one `:`
    /// - If the field part selects no attribute
    /// - If either part is not a valid regex
    pub fn compile(spec: &str) -> Result<Self, FilterError> {
        let mut parts = spec.split(':');
        let (Some(field), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(FilterError::Malformed(spec.to_owned()));
        };

        let fields = matchable_fields(field)?;
        let pattern = Regex::new(value).map_err(|source| FilterError::InvalidPattern {
            pattern: value.to_owned(),
            source,
        })?;

        Ok(Self { fields, pattern })
    }

    #[must_use]
    pub fn fields(&self) -> &[Attribute] {
        &self.fields
    }

    #[must_use]
    pub fn matches(&self, host: &HostRecord) -> bool {
        self.fields.iter().any(|field| {
            let value = field.value(host);
            let matched = self.pattern.is_match(value);
            trace!(field = field.name(), value, matched, pattern = %self.pattern, "filter");
            matched
        })
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|field| field.name()).collect();
        write!(f, "{}:{}", names.join("|"), self.pattern)
    }
}
