use std::collections::BTreeMap;
use std::env;
use std::fs;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::util::dirs;

const CONFIG_FILE: &str = "hssh.toml";
const CONFIG_ENV: &str = "HSSH_CONFIG";
const ENV_PREFIX: &str = "HSSH_";

/// Everything `hssh` can be configured with.
///
/// Built once at startup from `hssh.toml` and `HSSH_*` environment variables,
/// then passed by reference wherever it is needed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Provider used to resolve destinations, e.g. `inventory`.
    pub provider: Option<String>,
    /// Per-provider settings, keyed by provider id.
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Offer a menu when several hosts match and a terminal is attached.
    pub interactive: bool,
    /// Default `field:value` filter applied to candidates.
    pub filter: Option<String>,
    /// Path to the real `ssh` executable.
    pub ssh: Option<Utf8PathBuf>,
    pub debug: bool,
    /// Tracing filter directive, takes precedence over `debug`.
    pub log_level: Option<String>,
    pub logfile: Option<Utf8PathBuf>,

    #[serde(skip)]
    all: toml::Table,
}

/// Settings of one provider. Keys other than the jump host ones are kept for
/// the provider itself to interpret.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub jumphost: Option<String>,
    pub jumpuser: Option<String>,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: None,
            providers: BTreeMap::new(),
            interactive: true,
            filter: None,
            ssh: None,
            debug: false,
            log_level: None,
            logfile: None,
            all: toml::Table::new(),
        }
    }
}

/// Loading
impl Settings {
    /// Location of the configuration file: `$HSSH_CONFIG`, else `hssh.toml`
    /// in the user configuration directory.
    #[must_use]
    pub fn path() -> Option<Utf8PathBuf> {
        if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Utf8PathBuf::try_from(std::path::PathBuf::from(path)).ok();
        }
        dirs::config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Reads the configuration file, without environment overrides.
    ///
    /// # Errors
    ///
    /// - If no configuration file can be located or read
    /// - If the file is not valid TOML or has ill-typed values
    pub fn load_file() -> Result<Self> {
        let path = Self::path().context("could not find config file")?;
        Self::from_path(&path)
    }

    /// # Errors
    ///
    /// - If the file cannot be read
    /// - If the file is not valid TOML or has ill-typed values
    pub fn from_path(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {path}"))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {path}"))
    }

    /// # Errors
    ///
    /// If `text` is not valid TOML or has ill-typed values.
    pub fn from_toml(text: &str) -> Result<Self> {
        let all: toml::Table = toml::from_str(text)?;
        let mut settings: Self = toml::Value::Table(all.clone()).try_into()?;
        settings.all = all;
        Ok(settings)
    }

    /// Applies `HSSH_*` overrides from `vars`, normally [`env::vars`].
    ///
    /// Returns the variables that were recognized but could not be applied,
    /// so they can be reported once logging is up.
    pub fn apply_env<I>(&mut self, vars: I) -> Vec<String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut rejected = Vec::new();

        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let applied = match key {
                "PROVIDER" => set_string(&mut self.provider, value),
                "FILTER" => set_string(&mut self.filter, value),
                "SSH" => set_path(&mut self.ssh, value),
                "LOG_LEVEL" => set_string(&mut self.log_level, value),
                "LOGFILE" => set_path(&mut self.logfile, value),
                "INTERACTIVE" => set_bool(&mut self.interactive, &value),
                "DEBUG" => set_bool(&mut self.debug, &value),
                other => self.apply_provider_env(other, value),
            };
            if !applied {
                rejected.push(name);
            }
        }

        rejected
    }

    fn apply_provider_env(&mut self, key: &str, value: String) -> bool {
        let Some(rest) = key.strip_prefix("PROVIDERS_") else {
            // Unrelated variables sharing the prefix, such as HSSH_CONFIG.
            return true;
        };
        if let Some(id) = rest.strip_suffix("_JUMPHOST") {
            let entry = self.providers.entry(id.to_lowercase()).or_default();
            return set_string(&mut entry.jumphost, value);
        }
        if let Some(id) = rest.strip_suffix("_JUMPUSER") {
            let entry = self.providers.entry(id.to_lowercase()).or_default();
            return set_string(&mut entry.jumpuser, value);
        }
        false
    }
}

/// Accessors
impl Settings {
    /// The whole configuration tree as read from the file.
    #[must_use]
    pub fn all(&self) -> &toml::Table {
        &self.all
    }

    #[must_use]
    pub fn provider_settings(&self, provider: &str) -> Option<&ProviderSettings> {
        self.providers.get(provider)
    }

    /// Jump host name configured for `provider`, if any.
    #[must_use]
    pub fn jumphost(&self, provider: &str) -> Option<&str> {
        self.provider_settings(provider)?
            .jumphost
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    /// User to log into the jump host of `provider` as, if any.
    #[must_use]
    pub fn jumpuser(&self, provider: &str) -> Option<&str> {
        self.provider_settings(provider)?
            .jumpuser
            .as_deref()
            .filter(|name| !name.is_empty())
    }
}

fn set_string(slot: &mut Option<String>, value: String) -> bool {
    *slot = Some(value).filter(|v| !v.is_empty());
    true
}

fn set_path(slot: &mut Option<Utf8PathBuf>, value: String) -> bool {
    *slot = Some(value).filter(|v| !v.is_empty()).map(Utf8PathBuf::from);
    true
}

fn set_bool(slot: &mut bool, value: &str) -> bool {
    match parse_bool(value) {
        Some(flag) => {
            *slot = flag;
            true
        }
        None => false,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const SAMPLE: &str = r#"
provider = "inventory"
interactive = false
filter = "zone:eu"
debug = true
logfile = "/tmp/hssh.log"

[providers.inventory]
jumphost = "bastion"
jumpuser = "admin"

[[providers.inventory.hosts]]
id = "i-1"
public_ipv4 = "1.2.3.4"
"#;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert!(settings.interactive);
        assert!(!settings.debug);
        assert_eq!(settings.provider, None);
    }

    #[test]
    fn from_toml_works() {
        let settings = Settings::from_toml(SAMPLE).unwrap();
        assert_eq!(settings.provider.as_deref(), Some("inventory"));
        assert!(!settings.interactive);
        assert!(settings.debug);
        assert_eq!(settings.filter.as_deref(), Some("zone:eu"));
        assert_eq!(settings.logfile, Some(Utf8PathBuf::from("/tmp/hssh.log")));
        assert_eq!(settings.jumphost("inventory"), Some("bastion"));
        assert_eq!(settings.jumpuser("inventory"), Some("admin"));
        assert_eq!(settings.jumphost("aws"), None);

        let inventory = settings.provider_settings("inventory").unwrap();
        assert!(inventory.extra.contains_key("hosts"));
        assert!(settings.all().contains_key("providers"));
    }

    #[test]
    fn from_toml_rejects_bad_types() {
        assert!(Settings::from_toml("interactive = \"maybe\"").is_err());
        assert!(Settings::from_toml("provider = ").is_err());
    }

    #[test]
    fn from_path_works() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let path = Utf8PathBuf::try_from(file.path().to_path_buf()).unwrap();
        let settings = Settings::from_path(&path).unwrap();
        assert_eq!(settings.provider.as_deref(), Some("inventory"));
    }

    #[test]
    fn from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().join("hssh.toml")).unwrap();
        assert!(Settings::from_path(&path).is_err());
    }

    #[test]
    fn apply_env_overrides_file() {
        let mut settings = Settings::from_toml(SAMPLE).unwrap();
        let rejected = settings.apply_env(vars(&[
            ("HSSH_PROVIDER", "aws"),
            ("HSSH_INTERACTIVE", "Yes"),
            ("HSSH_DEBUG", "0"),
            ("HSSH_FILTER", ""),
            ("HSSH_SSH", "/opt/bin/ssh"),
            ("HSSH_PROVIDERS_AWS_JUMPHOST", "gate"),
            ("HSSH_PROVIDERS_AWS_JUMPUSER", "ec2-user"),
            ("HSSH_CONFIG", "/elsewhere.toml"),
            ("HOME", "/root"),
        ]));
        assert_eq!(rejected, Vec::<String>::new());
        assert_eq!(settings.provider.as_deref(), Some("aws"));
        assert!(settings.interactive);
        assert!(!settings.debug);
        assert_eq!(settings.filter, None);
        assert_eq!(settings.ssh, Some(Utf8PathBuf::from("/opt/bin/ssh")));
        assert_eq!(settings.jumphost("aws"), Some("gate"));
        assert_eq!(settings.jumpuser("aws"), Some("ec2-user"));
        assert_eq!(settings.jumphost("inventory"), Some("bastion"));
    }

    #[test]
    fn apply_env_reports_rejected() {
        let mut settings = Settings::default();
        let rejected = settings.apply_env(vars(&[
            ("HSSH_DEBUG", "sometimes"),
            ("HSSH_PROVIDERS_AWS_REGION", "eu-west-1"),
        ]));
        assert_eq!(
            rejected,
            vec!["HSSH_DEBUG".to_owned(), "HSSH_PROVIDERS_AWS_REGION".to_owned()]
        );
        assert!(!settings.debug);
    }

    #[rstest]
    #[case("1", Some(true))]
    #[case("TRUE", Some(true))]
    #[case(" on ", Some(true))]
    #[case("no", Some(false))]
    #[case("Off", Some(false))]
    #[case("", None)]
    #[case("2", None)]
    fn parse_bool_works(#[case] value: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(value), expected);
    }
}
