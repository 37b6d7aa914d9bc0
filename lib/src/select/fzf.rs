use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;

use super::lines;
use super::parse_choice;
use super::Prompt;
use super::FINDER_PROMPT;
use super::PREVIEW;
use super::SHOWN_COLUMNS;
use crate::host::HostRecord;

/// Lets the user pick a host with `fzf`.
#[derive(Debug, Clone)]
pub struct FzfPrompt {
    fzf: PathBuf,
}

impl FzfPrompt {
    pub fn new(fzf: impl Into<PathBuf>) -> Self {
        Self { fzf: fzf.into() }
    }
}

impl Prompt for FzfPrompt {
    fn choose(&self, hosts: &[HostRecord]) -> Result<usize> {
        let mut cmd = Command::new(&self.fzf);
        cmd.args([
            "--delimiter=\t".to_owned(),
            format!("--with-nth={SHOWN_COLUMNS}"),
            "--select-1".to_owned(),
            format!("--prompt={FINDER_PROMPT}"),
            format!("--preview={PREVIEW}"),
            "--preview-window=right:40%:wrap".to_owned(),
        ]);

        // Stdout needs to be piped to capture the choice, while stderr stays
        // inherited so fzf can draw on the terminal. Stdin must be piped too,
        // otherwise fzf fails with `Failed to read /dev/tty`.
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let child = cmd.spawn().context("unable to start fzf")?;

        child
            .stdin
            .as_ref()
            .context("unable to open fzf stdin")?
            .write_all(lines(hosts).as_bytes())
            .context("unable to write to fzf stdin")?;

        let output = child.wait_with_output()?;

        // Exit status 130 is an interrupt, 1 means nothing matched the query
        if !output.status.success() {
            bail!("fzf selection failed: {}", output.status);
        }

        let selected = String::from_utf8(output.stdout)?;
        parse_choice(&selected, hosts.len())
    }
}
