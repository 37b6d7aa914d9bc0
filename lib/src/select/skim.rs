use std::io::Cursor;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use skim::prelude::Skim;
use skim::prelude::SkimItemReader;
use skim::prelude::SkimOptions;
use skim::prelude::SkimOptionsBuilder;

use super::lines;
use super::parse_choice;
use super::Prompt;
use super::FINDER_PROMPT;
use super::PREVIEW;
use super::SHOWN_COLUMNS;
use crate::host::HostRecord;

/// Lets the user pick a host with the embedded `skim` finder. Used when `fzf`
/// is not installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkimPrompt {}

fn options() -> Result<SkimOptions<'static>> {
    let options = SkimOptionsBuilder::default()
        .delimiter(Some("\t"))
        .with_nth(Some(SHOWN_COLUMNS))
        .select1(true)
        .prompt(Some(FINDER_PROMPT))
        .preview(Some(PREVIEW))
        .preview_window(Some("right:40%:wrap"))
        .build()?;
    Ok(options)
}

impl Prompt for SkimPrompt {
    fn choose(&self, hosts: &[HostRecord]) -> Result<usize> {
        let options = options()?;

        let items = SkimItemReader::default().of_bufread(Cursor::new(lines(hosts).into_bytes()));

        let output =
            Skim::run_with(&options, Some(items)).context("Failed to run Skim selection")?;
        if output.is_abort {
            bail!("selection aborted");
        }

        let selected = output
            .selected_items
            .first()
            .context("Selection was empty")?
            .output()
            .to_string();

        parse_choice(&selected, hosts.len())
    }
}
