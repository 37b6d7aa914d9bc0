//! Scanning and rewriting of OpenSSH command lines.
//!
//! Only the option grammar of `ssh(1)` is understood here, enough to locate
//! the destination token. Everything after the destination is the remote
//! command and is left alone.

use thiserror::Error;

/// Option letters that take no argument. `1` and `2` are accepted for
/// compatibility and rejected or ignored by `ssh` itself.
const FLAGS: &str = "1246AaCfGgKkMNnqsTtVvXxYy";

/// Option letters that take an argument, attached or in the next token.
const FLAGS_WITH_ARG: &str = "BbcDEeFIiJLlmOoPpQRSWw";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown option -{0}")]
    UnknownOption(char),

    #[error("option -{0} requires an argument")]
    MissingArgument(char),

    #[error("no destination in command line")]
    NoDestination,

    #[error("destination {0:?} has no host part")]
    EmptyHost(String),
}

/// Options and destination found in an SSH command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshArgs {
    /// Option letters with their argument, in command line order.
    pub options: Vec<(char, Option<String>)>,
    /// Index of the destination token within the full argv.
    pub destination: Option<usize>,
    /// Index of the `--` token ending options before the destination.
    pub separator: Option<usize>,
}

impl SshArgs {
    /// Scans `argv` (including `argv[0]`) for options and the destination.
    ///
    /// Like `ssh`, options directly following the destination are read too,
    /// up to the first token that is not an option. Problems in that trailing
    /// run are not errors: the run just ends there.
    ///
    /// # Errors
    ///
    /// - If an option letter before the destination is unknown to `ssh`
    /// - If an option before the destination is missing its argument
    pub fn scan(argv: &[String]) -> Result<Self, ParseError> {
        let mut scanned = Self::default();
        let mut index = 1;

        while index < argv.len() {
            let token = argv[index].as_str();

            if token == "--" {
                scanned.separator = Some(index);
                if index + 1 < argv.len() {
                    scanned.destination = Some(index + 1);
                }
                return Ok(scanned);
            }

            let Some(cluster) = option_cluster(token) else {
                scanned.destination = Some(index);
                break;
            };
            index = scanned.read_cluster(argv, index, cluster)?;
        }

        if let Some(destination) = scanned.destination {
            let mut index = destination + 1;
            while let Some(cluster) = argv.get(index).and_then(|token| option_cluster(token)) {
                match scanned.read_cluster(argv, index, cluster) {
                    Ok(next) => index = next,
                    Err(_) => break,
                }
            }
        }

        Ok(scanned)
    }

    /// Records the options of the cluster at `argv[index]` and returns the
    /// index of the token after it and its argument.
    fn read_cluster(&mut self, argv: &[String], index: usize, cluster: &str) -> Result<usize, ParseError> {
        let mut next = index + 1;
        for (offset, letter) in cluster.char_indices() {
            if FLAGS.contains(letter) {
                self.options.push((letter, None));
                continue;
            }
            if !FLAGS_WITH_ARG.contains(letter) {
                return Err(ParseError::UnknownOption(letter));
            }

            let attached = &cluster[offset + letter.len_utf8()..];
            let value = if attached.is_empty() {
                next += 1;
                argv.get(index + 1)
                    .cloned()
                    .ok_or(ParseError::MissingArgument(letter))?
            } else {
                attached.to_owned()
            };
            self.options.push((letter, Some(value)));
            break;
        }
        Ok(next)
    }

    /// Whether `-V` was given, before or right after the destination.
    #[must_use]
    pub fn wants_version(&self) -> bool {
        self.options.iter().any(|(letter, _)| *letter == 'V')
    }
}

/// Letters of an option token such as `-vA`, or `None` for anything else.
fn option_cluster(token: &str) -> Option<&str> {
    token
        .strip_prefix('-')
        .filter(|rest| !rest.is_empty() && *rest != "-")
}

/// An SSH command line with a known destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCommand {
    argv: Vec<String>,
    destination: usize,
    separator: Option<usize>,
    hostname: String,
}

impl SshCommand {
    /// # Errors
    ///
    /// - If the command line cannot be scanned
    /// - If there is no destination, or it has no host part
    pub fn parse(argv: Vec<String>) -> Result<Self, ParseError> {
        let scanned = SshArgs::scan(&argv)?;
        let destination = scanned.destination.ok_or(ParseError::NoDestination)?;
        let hostname = hostname_of(&argv[destination])?;
        Ok(Self {
            argv,
            destination,
            separator: scanned.separator,
            hostname,
        })
    }

    /// Host part of the destination, without user or port.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    #[must_use]
    pub fn into_argv(self) -> Vec<String> {
        self.argv
    }

    /// Replaces `argv[0]`, the program name.
    pub fn set_program(&mut self, program: impl Into<String>) {
        if let Some(first) = self.argv.first_mut() {
            *first = program.into();
        }
    }

    /// Inserts options right after the program name.
    pub fn prepend_options<I>(&mut self, options: I)
    where
        I: IntoIterator<Item = String>,
    {
        let at = self.argv.len().min(1);
        self.insert(at, options);
    }

    /// Inserts options where `ssh` still reads them as options: right after
    /// the destination, ahead of any remote command, or in front of `--`
    /// when the command line has one.
    pub fn append_options<I>(&mut self, options: I)
    where
        I: IntoIterator<Item = String>,
    {
        let at = self.separator.unwrap_or(self.destination + 1);
        self.insert(at, options);
    }

    fn insert<I>(&mut self, at: usize, options: I)
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.argv.len();
        self.argv.splice(at..at, options);
        let added = self.argv.len() - before;

        if self.destination >= at {
            self.destination += added;
        }
        if let Some(separator) = self.separator.as_mut().filter(|separator| **separator >= at) {
            *separator += added;
        }
    }
}

/// Extracts the host from `host`, `user@host` or `ssh://[user@]host[:port]`.
fn hostname_of(destination: &str) -> Result<String, ParseError> {
    let host = if let Some(uri) = destination.strip_prefix("ssh://") {
        let authority = uri.split('/').next().unwrap_or_default();
        let hostport = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
        if let Some(bracketed) = hostport.strip_prefix('[') {
            bracketed.split(']').next().unwrap_or_default()
        } else {
            hostport.split(':').next().unwrap_or_default()
        }
    } else {
        destination
            .rsplit_once('@')
            .map_or(destination, |(_, host)| host)
    };

    if host.is_empty() {
        return Err(ParseError::EmptyHost(destination.to_owned()));
    }
    Ok(host.to_owned())
}
