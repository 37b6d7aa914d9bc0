use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use anyhow::Context;
use anyhow::Error;
use anyhow::Result;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use tracing::debug;

/// A program and the full argument vector to run it with, `argv[0]`
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: Utf8PathBuf,
    pub argv: Vec<OsString>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<Utf8PathBuf>, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(self.argv.iter().skip(1));
        command
    }

    /// Replaces the current process with the invocation. The environment is
    /// inherited unchanged.
    ///
    /// Only returns if the replacement failed. Anything that must be flushed
    /// has to be released before calling this.
    #[cfg(unix)]
    pub fn exec(self) -> Error {
        use std::os::unix::process::CommandExt;

        debug!(program = %self.program, argv = ?self.argv, "exec");
        let mut command = self.command();
        if let Some(arg0) = self.argv.first() {
            command.arg0(arg0);
        }
        let error = command.exec();
        Error::new(error).context(format!("unable to exec {}", self.program))
    }

    /// Runs the invocation to completion and exits with its status, as close
    /// to process replacement as the platform allows.
    #[cfg(not(unix))]
    pub fn exec(self) -> Error {
        debug!(program = %self.program, argv = ?self.argv, "spawn");
        match self.command().status() {
            Ok(status) => std::process::exit(status.code().unwrap_or(1)),
            Err(error) => Error::new(error).context(format!("unable to run {}", self.program)),
        }
    }
}

/// Locates the real SSH client.
///
/// A configured path is used as is. Otherwise the first `ssh` on `PATH` that
/// is not the running executable wins, so that `hssh` can itself be
/// installed as `ssh`.
///
/// # Errors
///
/// If no suitable executable exists.
pub fn find_ssh(configured: Option<&Utf8Path>) -> Result<Utf8PathBuf> {
    if let Some(path) = configured {
        return Ok(path.to_owned());
    }
    let current = env::current_exe().ok();
    let candidates = which::which_all("ssh").context("could not find ssh in PATH")?;
    first_other_than(candidates, current.as_deref())
        .context("could not find ssh neither in path nor in configuration")
}

fn first_other_than<I>(candidates: I, current: Option<&Path>) -> Option<Utf8PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let current = current.and_then(|path| fs::canonicalize(path).ok());
    candidates
        .into_iter()
        .filter(|candidate| {
            current.is_none() || fs::canonicalize(candidate).ok() != current
        })
        .find_map(|candidate| Utf8PathBuf::try_from(candidate).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_skips_argv0() {
        let invocation = Invocation::new("/usr/bin/ssh", ["hssh", "-v", "db-1"]);
        let command = invocation.command();
        assert_eq!(command.get_program(), "/usr/bin/ssh");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, ["-v", "db-1"]);
    }

    #[cfg(unix)]
    #[test]
    fn exec_failure_returns() {
        let invocation = Invocation::new("/nonexistent/hssh-test/ssh", ["ssh"]);
        let error = invocation.exec();
        assert!(error.to_string().contains("unable to exec"));
    }

    #[test]
    fn configured_ssh_wins() {
        let ssh = find_ssh(Some(Utf8Path::new("/opt/ssh/bin/ssh"))).unwrap();
        assert_eq!(ssh, "/opt/ssh/bin/ssh");
    }

    #[test]
    fn skips_running_executable() {
        let dir = tempfile::tempdir().unwrap();
        let wrapper = dir.path().join("wrapper-ssh");
        let real = dir.path().join("real-ssh");
        fs::write(&wrapper, "").unwrap();
        fs::write(&real, "").unwrap();

        let found = first_other_than(vec![wrapper.clone(), real.clone()], Some(wrapper.as_path()));
        assert_eq!(found.map(PathBuf::from), Some(real.clone()));

        let found = first_other_than(vec![wrapper.clone()], Some(wrapper.as_path()));
        assert_eq!(found, None);

        let found = first_other_than(vec![wrapper.clone(), real], None);
        assert_eq!(found.map(PathBuf::from), Some(wrapper));
    }
}
