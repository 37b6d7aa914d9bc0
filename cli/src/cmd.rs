use std::env;
use std::ffi::OsString;
use std::io::IsTerminal;

use anyhow::Result;
use hssh::command::SshArgs;
use hssh::config::Settings;
use hssh::exec;
use hssh::exec::Invocation;
use hssh::pipeline::Pipeline;
use hssh::pipeline::PipelineError;
use hssh::probe::CachedProbe;
use hssh::probe::SshProbe;
use hssh::resolve::default_registry;
use hssh::select;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::logging;

pub const VERSION: &str = concat!(
    "hssh ",
    env!("HSSH_VERSION"),
    " (",
    env!("HSSH_BUILD_HASH"),
    ")"
);

/// What the process should do once logging is torn down.
#[derive(Debug)]
pub enum Outcome {
    /// Replace the process.
    Exec(Invocation),
    /// Report a selection failure and exit with its code.
    Fail(PipelineError),
}

pub fn run() -> Result<Outcome> {
    let raw: Vec<OsString> = env::args_os().collect();

    let (mut settings, config_error) = match Settings::load_file() {
        Ok(settings) => (settings, None),
        Err(error) => (Settings::default(), Some(error)),
    };
    let rejected = settings.apply_env(env_vars());

    let _guard = logging::init_tracing(&settings)?;

    if let Some(error) = config_error {
        error!("{error:#}");
    }
    for name in rejected {
        warn!(%name, "ignoring invalid environment override");
    }

    let ssh = exec::find_ssh(settings.ssh.as_deref())?;
    debug!(%ssh, "using ssh executable");

    let argv = match raw
        .iter()
        .map(|arg| arg.clone().into_string())
        .collect::<Result<Vec<String>, _>>()
    {
        Ok(argv) => argv,
        Err(_) => {
            warn!(argv = ?raw, "fallback: arguments are not valid UTF-8");
            return Ok(Outcome::Exec(Invocation::new(ssh, raw)));
        }
    };

    if SshArgs::scan(&argv).is_ok_and(|args| args.wants_version()) {
        eprintln!("{VERSION}");
        return Ok(Outcome::Exec(Invocation::new(ssh, argv)));
    }

    let resolvers = default_registry();
    let pipeline = Pipeline::builder()
        .settings(&settings)
        .resolvers(&resolvers)
        .ssh(&ssh)
        .prompt(select::auto())
        .probe(CachedProbe::new(SshProbe::new(ssh.clone())))
        .is_tty(std::io::stdin().is_terminal() && std::io::stderr().is_terminal())
        .build();

    match pipeline.plan(argv) {
        Ok(plan) => {
            debug!(argv = ?plan.argv(), "executing command");
            Ok(Outcome::Exec(plan.into_invocation(&ssh)))
        }
        Err(error) => {
            error!("{error:#}");
            Ok(Outcome::Fail(error))
        }
    }
}

/// Environment variables with UTF-8 names and values; others cannot be
/// overrides.
fn env_vars() -> impl Iterator<Item = (String, String)> {
    env::vars_os().filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}
