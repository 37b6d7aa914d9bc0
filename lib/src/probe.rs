use std::cell::OnceCell;
use std::process::Command;
use std::process::Stdio;

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::debug;

/// Diagnostic printed by clients without `-J` when given `-J`: getopt reports
/// `illegal option -- J` or `unknown option -- J` depending on the platform.
/// A client with `-J` complains `option requires an argument -- J` instead,
/// which does not contain this text. Only stable under `LC_ALL=C`.
pub const UNSUPPORTED_JUMP_DIAGNOSTIC: &str = "option -- J";

#[derive(Debug, Error)]
#[error("unable to determine whether {ssh} supports -J")]
pub struct ProbeError {
    ssh: Utf8PathBuf,
    #[source]
    source: std::io::Error,
}

/// Tells whether the installed SSH client understands native jump syntax.
pub trait JumpSupport {
    /// # Errors
    ///
    /// If the answer could not be determined.
    fn supports_native_jump(&self) -> Result<bool, ProbeError>;
}

/// Asks the SSH client itself, by running it with a bare `-J`.
#[derive(Debug, Clone)]
pub struct SshProbe {
    ssh: Utf8PathBuf,
}

impl SshProbe {
    #[must_use]
    pub fn new(ssh: impl Into<Utf8PathBuf>) -> Self {
        Self { ssh: ssh.into() }
    }
}

impl ProbeError {
    pub fn new(ssh: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self {
            ssh: ssh.into(),
            source,
        }
    }
}

impl JumpSupport for SshProbe {
    fn supports_native_jump(&self) -> Result<bool, ProbeError> {
        let output = Command::new(&self.ssh)
            .arg("-J")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProbeError::new(self.ssh.clone(), source))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let supported = supports_from_output(&combined);
        debug!(ssh = %self.ssh, supported, output = combined.trim(), "probed -J support");
        Ok(supported)
    }
}

/// Interprets the combined output of `ssh -J`.
#[must_use]
pub fn supports_from_output(output: &str) -> bool {
    !output.contains(UNSUPPORTED_JUMP_DIAGNOSTIC)
}

/// Remembers the first successful answer of the wrapped probe.
#[derive(Debug)]
pub struct CachedProbe<P> {
    inner: P,
    answer: OnceCell<bool>,
}

impl<P> CachedProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            answer: OnceCell::new(),
        }
    }
}

impl<P: JumpSupport> JumpSupport for CachedProbe<P> {
    fn supports_native_jump(&self) -> Result<bool, ProbeError> {
        if let Some(answer) = self.answer.get() {
            return Ok(*answer);
        }
        let answer = self.inner.supports_native_jump()?;
        Ok(*self.answer.get_or_init(|| answer))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("option requires an argument -- J\nusage: ssh [-46AaCfGgKkMNnqsTtVvXxYy]", true)]
    #[case("ssh: illegal option -- J\nusage: ssh [-1246AaCfgKkMNnqsTtVvXxYy]", false)]
    #[case("ssh: unknown option -- J\nusage: ssh [-1246AaCfgKkMNnqsTtVvXxYy]", false)]
    #[case("", true)]
    fn supports_from_output_works(#[case] output: &str, #[case] expected: bool) {
        assert_eq!(supports_from_output(output), expected);
    }

    struct Counting {
        calls: Cell<usize>,
    }

    impl JumpSupport for Counting {
        fn supports_native_jump(&self) -> Result<bool, ProbeError> {
            self.calls.set(self.calls.get() + 1);
            Ok(true)
        }
    }

    #[test]
    fn cached_probe_asks_once() {
        let probe = CachedProbe::new(Counting { calls: Cell::new(0) });
        assert!(probe.supports_native_jump().unwrap());
        assert!(probe.supports_native_jump().unwrap());
        assert_eq!(probe.inner.calls.get(), 1);
    }

    #[test]
    fn missing_client_is_an_error() {
        let probe = SshProbe::new("/nonexistent/hssh-test/ssh");
        assert!(probe.supports_native_jump().is_err());
    }
}
