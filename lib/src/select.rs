mod fzf;
mod skim;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use enum_dispatch::enum_dispatch;
use thiserror::Error;
use tracing::debug;
use tracing::error;

pub use self::fzf::FzfPrompt;
pub use self::skim::SkimPrompt;
use crate::filter::Filter;
use crate::host::HostRecord;

/// Exit status when a filter matches none of the candidates.
pub const EXIT_NO_MATCH: i32 = 2;

/// Exit status when a filter matches several candidates.
pub const EXIT_MULTIPLE_MATCHES: i32 = 3;

/// Exit status when the interactive prompt fails or is aborted.
pub const EXIT_PROMPT_FAILED: i32 = 1;

/// Why no single host could be chosen. All of these end the program.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("no host matching filter: {0}")]
    NoMatch(String),

    #[error("multiple hosts matching filter: {0}")]
    MultipleMatches(String),

    #[error("error in prompt: {0:#}")]
    Prompt(anyhow::Error),

    #[error("no candidate hosts to select from")]
    NoCandidates,
}

impl SelectError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoMatch(_) => EXIT_NO_MATCH,
            Self::MultipleMatches(_) => EXIT_MULTIPLE_MATCHES,
            Self::Prompt(_) | Self::NoCandidates => EXIT_PROMPT_FAILED,
        }
    }
}

/// Interactive single choice among hosts.
#[enum_dispatch]
pub trait Prompt {
    /// Returns the index of the chosen host.
    ///
    /// # Errors
    ///
    /// If the user aborts or the prompt cannot be shown.
    fn choose(&self, hosts: &[HostRecord]) -> Result<usize>;
}

#[enum_dispatch(Prompt)]
#[derive(Debug, Clone)]
pub enum PromptImpl {
    Fzf(FzfPrompt),
    Skim(SkimPrompt),
}

/// Prefers `fzf` if it exists on `PATH`, otherwise falls back to the built-in
/// `skim` finder.
#[must_use]
pub fn auto() -> PromptImpl {
    match which::which("fzf") {
        Ok(path) => FzfPrompt::new(path).into(),
        Err(_) => SkimPrompt::default().into(),
    }
}

/// How the selector may reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectMode {
    /// `interactive` setting.
    pub interactive: bool,
    /// Whether a user is attached to the terminal.
    pub is_tty: bool,
}

/// Narrows `candidates` down to exactly one host.
///
/// Without a terminal, or with interactive mode off, the filter decides: no
/// filter means the first candidate, otherwise exactly one candidate must
/// match. With a terminal and interactive mode on, the user picks.
///
/// # Errors
///
/// - If there are no candidates
/// - If the filter matches zero or several candidates
/// - If the prompt fails or is aborted
pub fn select<P: Prompt>(
    mut candidates: Vec<HostRecord>,
    filter: Option<&Filter>,
    mode: SelectMode,
    prompt: &P,
) -> Result<HostRecord, SelectError> {
    if candidates.is_empty() {
        return Err(SelectError::NoCandidates);
    }
    if !mode.is_tty || !mode.interactive {
        return select_by_filter(candidates, filter);
    }

    let index = prompt.choose(&candidates).map_err(SelectError::Prompt)?;
    if index >= candidates.len() {
        return Err(SelectError::Prompt(anyhow::anyhow!(
            "choice {index} out of range"
        )));
    }
    Ok(candidates.swap_remove(index))
}

/// Picks the single candidate matching `filter`, or the first one if there is
/// no filter.
///
/// # Errors
///
/// - If there are no candidates
/// - If the filter matches zero or several candidates
pub fn select_by_filter(
    candidates: Vec<HostRecord>,
    filter: Option<&Filter>,
) -> Result<HostRecord, SelectError> {
    let Some(filter) = filter else {
        return candidates
            .into_iter()
            .next()
            .ok_or(SelectError::NoCandidates);
    };

    let mut matching: Vec<HostRecord> = candidates
        .into_iter()
        .filter(|host| filter.matches(host))
        .collect();

    match matching.len() {
        0 => {
            error!(%filter, "no host matching filter");
            Err(SelectError::NoMatch(filter.to_string()))
        }
        1 => {
            let host = matching.remove(0);
            debug!(?host, "connecting to host");
            Ok(host)
        }
        count => {
            error!(%filter, count, "multiple hosts matching filter");
            Err(SelectError::MultipleMatches(filter.to_string()))
        }
    }
}

/// Multi-line description of a host, as shown by the prompts.
#[must_use]
pub fn describe(host: &HostRecord) -> String {
    let mut lines = vec![
        format!("instance name: {}", host.instance_name),
        format!("provider: {}", host.provider),
        format!("region: {}", host.region),
        format!("zone: {}", host.zone),
        format!("id: {}", host.id),
        format!("private ipv4: {}", host.private_ipv4),
        format!("private ipv6: {}", host.private_ipv6),
        format!("private name: {}", host.private_name),
        format!("public ipv4: {}", host.public_ipv4),
        format!("public ipv6: {}", host.public_ipv6),
        format!("public name: {}", host.public_name),
    ];
    lines.extend(
        host.tags
            .iter()
            .map(|(key, value)| format!("tag {key}: {value}")),
    );
    lines.join("\n")
}

/// One line per host: the hidden index, the summary columns, then the details
/// shown in the preview pane.
/// Columns of [`lines`] shown in the finder list, skipping the index.
const SHOWN_COLUMNS: &str = "2..8";

/// Finder prompt text.
const FINDER_PROMPT: &str = "Host> ";

/// Preview command printing the details columns of [`lines`] one per line.
const PREVIEW: &str = "printf '%s\\n' {9..} | tr '\\t' '\\n'";

fn lines(hosts: &[HostRecord]) -> String {
    hosts
        .iter()
        .enumerate()
        .map(|(index, host)| {
            let details = describe(host).replace('\n', "\t");
            format!(
                "{index}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{details}\n",
                host.id,
                host.instance_name,
                host.provider,
                host.region,
                host.zone,
                host.public_address().unwrap_or("-"),
                host.private_address().unwrap_or("-"),
            )
        })
        .collect()
}

fn parse_choice(selected: &str, count: usize) -> Result<usize> {
    let index: usize = selected
        .split('\t')
        .next()
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .context("selection was empty")?
        .parse()
        .context("unexpected finder output")?;
    if index >= count {
        bail!("choice {index} out of range");
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn candidates() -> Vec<HostRecord> {
        vec![
            HostRecord::builder().id("a").zone("eu-west-1a").build(),
            HostRecord::builder().id("b").zone("eu-west-1b").build(),
            HostRecord::builder().id("c").zone("us-east-1a").build(),
        ]
    }

    /// Answers with a fixed choice, or fails when there is none.
    struct Scripted(Option<usize>);

    impl Prompt for Scripted {
        fn choose(&self, _hosts: &[HostRecord]) -> Result<usize> {
            self.0.ok_or_else(|| anyhow::anyhow!("aborted"))
        }
    }

    const BATCH: SelectMode = SelectMode {
        interactive: true,
        is_tty: false,
    };

    const TERMINAL: SelectMode = SelectMode {
        interactive: true,
        is_tty: true,
    };

    #[test]
    fn no_filter_returns_first() {
        let host = select(candidates(), None, BATCH, &Scripted(None)).unwrap();
        assert_eq!(host, candidates()[0]);
    }

    #[rstest]
    #[case("zone:us-east", "c")]
    #[case("id:^b$", "b")]
    fn filter_matching_one(#[case] spec: &str, #[case] expected: &str) {
        let filter = Filter::compile(spec).unwrap();
        let host = select(candidates(), Some(&filter), BATCH, &Scripted(None)).unwrap();
        assert_eq!(host.id, expected);
    }

    #[test]
    fn filter_matching_none() {
        let filter = Filter::compile("zone:ap-south").unwrap();
        let error = select(candidates(), Some(&filter), BATCH, &Scripted(None)).unwrap_err();
        assert!(matches!(error, SelectError::NoMatch(_)));
        assert_eq!(error.exit_code(), EXIT_NO_MATCH);
    }

    #[test]
    fn filter_matching_several() {
        let filter = Filter::compile("zone:eu-west").unwrap();
        let error = select(candidates(), Some(&filter), BATCH, &Scripted(None)).unwrap_err();
        assert!(matches!(error, SelectError::MultipleMatches(_)));
        assert_eq!(error.exit_code(), EXIT_MULTIPLE_MATCHES);
    }

    #[test]
    fn non_interactive_terminal_uses_filter() {
        let mode = SelectMode {
            interactive: false,
            is_tty: true,
        };
        let filter = Filter::compile("id:c").unwrap();
        let host = select(candidates(), Some(&filter), mode, &Scripted(Some(0))).unwrap();
        assert_eq!(host.id, "c");
    }

    #[test]
    fn terminal_prompts_user() {
        let filter = Filter::compile("id:c").unwrap();
        let host = select(candidates(), Some(&filter), TERMINAL, &Scripted(Some(1))).unwrap();
        assert_eq!(host.id, "b");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(7))]
    fn prompt_failure_is_fatal(#[case] choice: Option<usize>) {
        let error = select(candidates(), None, TERMINAL, &Scripted(choice)).unwrap_err();
        assert!(matches!(error, SelectError::Prompt(_)));
        assert_eq!(error.exit_code(), EXIT_PROMPT_FAILED);
    }

    #[test]
    fn empty_candidates() {
        let error = select(Vec::new(), None, BATCH, &Scripted(None)).unwrap_err();
        assert!(matches!(error, SelectError::NoCandidates));
    }

    #[test]
    fn describe_lists_tags() {
        let host = HostRecord::builder()
            .id("i-1")
            .tags([("role".to_owned(), "db".to_owned())].into())
            .build();
        let text = describe(&host);
        assert!(text.contains("id: i-1"));
        assert!(text.ends_with("tag role: db"));
    }

    #[test]
    fn lines_are_indexed() {
        let hosts = vec![
            HostRecord::builder().id("i-1").public_ipv4("1.2.3.4").build(),
            HostRecord::builder().id("i-2").private_ipv4("10.0.0.2").build(),
        ];
        let text = lines(&hosts);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("0\ti-1\t"));
        assert!(rows[1].starts_with("1\ti-2\t"));
        assert!(rows[0].contains("\t1.2.3.4\t-\t"));
        assert!(rows[1].contains("\t-\t10.0.0.2\t"));
    }

    #[rstest]
    #[case("1\ti-2\tweb\n", 3, Some(1))]
    #[case("0\n", 3, Some(0))]
    #[case("3\ti-4\n", 3, None)]
    #[case("\n", 3, None)]
    #[case("x\ti-1", 3, None)]
    fn parse_choice_works(#[case] selected: &str, #[case] count: usize, #[case] expected: Option<usize>) {
        assert_eq!(parse_choice(selected, count).ok(), expected);
    }
}
