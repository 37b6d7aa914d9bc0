use std::fmt;

/// Intermediate host the connection is routed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpHost {
    pub host: String,
    pub user: Option<String>,
}

impl JumpHost {
    pub fn new(host: impl Into<String>, user: Option<&str>) -> Self {
        Self {
            host: host.into(),
            user: user.filter(|u| !u.is_empty()).map(ToOwned::to_owned),
        }
    }
}

impl fmt::Display for JumpHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{user}@{}", self.host),
            None => write!(f, "{}", self.host),
        }
    }
}

/// Options routing a connection through `jump`, to be placed before the
/// destination.
///
/// With native support this is `-J [user@]host`. Otherwise an equivalent
/// `ProxyCommand` makes `ssh` (the program at `ssh`) forward its stdio to the
/// final destination from the jump host.
#[must_use]
pub fn jump_args(jump: &JumpHost, native: bool, ssh: &str) -> Vec<String> {
    if native {
        vec!["-J".to_owned(), jump.to_string()]
    } else {
        vec![
            "-o".to_owned(),
            format!("ProxyCommand {ssh} -W %h:%p {jump}"),
        ]
    }
}
