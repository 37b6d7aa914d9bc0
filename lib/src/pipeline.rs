use bon::Builder;
use camino::Utf8Path;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::instrument;
use tracing::warn;

use crate::command::SshCommand;
use crate::config::Settings;
use crate::exec::Invocation;
use crate::filter::Filter;
use crate::jump::jump_args;
use crate::jump::JumpHost;
use crate::probe::JumpSupport;
use crate::probe::ProbeError;
use crate::resolve::Resolve;
use crate::resolve::ResolverRegistry;
use crate::select::select;
use crate::select::Prompt;
use crate::select::SelectError;
use crate::select::SelectMode;

/// What to run in place of the user's command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Rewritten command line, starting with the SSH executable.
    Rewrite(Vec<String>),
    /// The user's command line, byte for byte.
    Fallback(Vec<String>),
}

impl Plan {
    #[must_use]
    pub fn argv(&self) -> &[String] {
        match self {
            Self::Rewrite(argv) | Self::Fallback(argv) => argv,
        }
    }

    #[must_use]
    pub fn into_invocation(self, ssh: &Utf8Path) -> Invocation {
        match self {
            Self::Rewrite(argv) | Self::Fallback(argv) => Invocation::new(ssh, argv),
        }
    }
}

/// Failures that must stop the program rather than fall back.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error("selected host {0} has no address")]
    NoAddress(String),
}

impl PipelineError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Select(error) => error.exit_code(),
            Self::Probe(_) | Self::NoAddress(_) => 1,
        }
    }
}

/// Turns the user's SSH command line into the one to execute.
///
/// Anything going wrong before candidates for the destination are known
/// yields [`Plan::Fallback`] with the untouched command line. Once candidates
/// exist, failing to settle on one of them is a [`PipelineError`].
#[derive(Builder)]
pub struct Pipeline<'a, P, J> {
    settings: &'a Settings,
    resolvers: &'a ResolverRegistry,
    /// The real SSH executable.
    ssh: &'a Utf8Path,
    prompt: P,
    probe: J,
    /// Whether a user is attached to the terminal.
    is_tty: bool,
}

impl<P: Prompt, J: JumpSupport> Pipeline<'_, P, J> {
    /// # Errors
    ///
    /// - If host selection fails (see [`select`])
    /// - If jump host support of the SSH client cannot be determined
    /// - If the selected host has no address
    #[instrument(skip_all)]
    pub fn plan(&self, argv: Vec<String>) -> Result<Plan, PipelineError> {
        let Some(provider) = self.settings.provider.as_deref() else {
            warn!("fallback: no provider specified");
            return Ok(Plan::Fallback(argv));
        };

        let mut command = match SshCommand::parse(argv.clone()) {
            Ok(command) => command,
            Err(error) => {
                warn!(%error, ?argv, "fallback: ssh command not parseable");
                return Ok(Plan::Fallback(argv));
            }
        };
        let hostname = command.hostname().to_owned();
        let resolver = self.resolvers.get(provider);

        self.route_through_jump_host(provider, resolver, &mut command)?;
        command.set_program(self.ssh.as_str());

        let Some(resolver) = resolver else {
            warn!(provider, "fallback: no resolver found for provider");
            return Ok(Plan::Fallback(argv));
        };

        let hosts = resolver
            .resolve(&hostname, self.settings)
            .unwrap_or_else(|error| {
                debug!(?error, %hostname, provider, "couldn't resolve host");
                Vec::new()
            });
        if hosts.is_empty() {
            warn!(%hostname, ?argv, "fallback: could not find any host matching destination");
            return Ok(Plan::Fallback(argv));
        }

        let filter = self.filter();
        let mode = SelectMode {
            interactive: self.settings.interactive,
            is_tty: self.is_tty,
        };
        let host = select(hosts, filter.as_ref(), mode, &self.prompt)?;

        let address = host
            .connect_address()
            .ok_or_else(|| PipelineError::NoAddress(host.id.clone()))?;
        command.append_options(["-o".to_owned(), format!("HostName={address}")]);

        debug!(argv = ?command.argv(), "rewritten command");
        Ok(Plan::Rewrite(command.into_argv()))
    }

    /// Prepends jump host options when the provider has a jump host. Any
    /// resolution problem leaves the command alone.
    fn route_through_jump_host(
        &self,
        provider: &str,
        resolver: Option<&(dyn Resolve + Send + Sync)>,
        command: &mut SshCommand,
    ) -> Result<(), ProbeError> {
        let Some(jumphost) = self.settings.jumphost(provider) else {
            debug!(provider, "no jumphost specified");
            return Ok(());
        };
        if jumphost == command.hostname() {
            debug!(jumphost, "destination is the jump host itself");
            return Ok(());
        }
        let Some(resolver) = resolver else {
            error!(provider, "no resolver found for provider, not using jump host");
            return Ok(());
        };

        let hosts = match resolver.resolve(jumphost, self.settings) {
            Ok(hosts) => hosts,
            Err(error) => {
                error!(?error, jumphost, provider, "couldn't resolve jump host");
                return Ok(());
            }
        };
        let Some(address) = hosts.first().and_then(|host| host.connect_address()) else {
            error!(jumphost, provider, "jump host resolution didn't return any address");
            return Ok(());
        };

        let jump = JumpHost::new(address, self.settings.jumpuser(provider));
        let native = self.probe.supports_native_jump()?;
        let fragment = jump_args(&jump, native, self.ssh.as_str());
        debug!(?fragment, "adding jump host arguments");
        command.prepend_options(fragment);
        Ok(())
    }

    /// The configured filter, or none if it is absent or unusable.
    fn filter(&self) -> Option<Filter> {
        let spec = self.settings.filter.as_deref()?;
        match Filter::compile(spec) {
            Ok(filter) => Some(filter),
            Err(error) => {
                error!(%error, "ignoring filter");
                None
            }
        }
    }
}
