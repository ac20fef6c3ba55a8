//! The text command grammar.
//!
//! A command is a message that starts with the configured prefix, followed
//! by a command name and its arguments:
//!
//! ```text
//! !set-temp-channel-name gaming Create Talk
//! !set-default-capacity music 10
//! !allow <@1234>
//! ```
//!
//! Names that take free text (`set-temp-channel-name`, `set-category-name`)
//! treat everything after the kind as the new name, spaces included.

use crate::{CategoryKind, ProtocolError, UserId};

/// Prefix used when the configuration doesn't set one.
pub const DEFAULT_PREFIX: &str = "!";

/// A parsed user command.
///
/// Integer arguments are kept as `i64` so the range checks (and their
/// error messages) live with the state they protect, not in the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // -- Admin: settings store --
    SetTempChannelName { kind: CategoryKind, name: String },
    SetCategoryName { kind: CategoryKind, name: String },
    SetDefaultCapacity { kind: CategoryKind, limit: i64 },
    ShowSettings,

    // -- Owner: the invoker's room --
    SetCapacity { limit: i64 },
    SetPrivate,
    SetPublic,
    Allow { user: UserId },
}

impl Command {
    /// Parses a message.
    ///
    /// Returns `Ok(None)` for messages that don't start with `prefix`
    /// (ordinary chat).
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownCommand`]: prefixed, but no such command
    /// - [`ProtocolError::MalformedArguments`]: known command, bad arguments
    pub fn parse(
        prefix: &str,
        content: &str,
    ) -> Result<Option<Self>, ProtocolError> {
        let Some(body) = content.trim_start().strip_prefix(prefix) else {
            return Ok(None);
        };
        let body = body.trim();
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };

        let command = match name.to_lowercase().as_str() {
            "set-temp-channel-name" | "settempchannel" => {
                let (kind, name) = kind_and_rest(args).ok_or(
                    ProtocolError::MalformedArguments {
                        command: "set-temp-channel-name",
                        usage: "set-temp-channel-name <kind> <name>",
                    },
                )?;
                Self::SetTempChannelName { kind, name }
            }
            "set-category-name" | "setcategory" => {
                let (kind, name) = kind_and_rest(args).ok_or(
                    ProtocolError::MalformedArguments {
                        command: "set-category-name",
                        usage: "set-category-name <kind> <name>",
                    },
                )?;
                Self::SetCategoryName { kind, name }
            }
            "set-default-capacity" | "setdefaultlimit" => {
                let malformed = ProtocolError::MalformedArguments {
                    command: "set-default-capacity",
                    usage: "set-default-capacity <kind> <0-99>",
                };
                let Some((kind, limit)) = kind_and_rest(args) else {
                    return Err(malformed);
                };
                let limit = limit.parse::<i64>().map_err(|_| malformed)?;
                Self::SetDefaultCapacity { kind, limit }
            }
            "show-settings" | "settings" => Self::ShowSettings,
            "set-capacity" | "setlimit" => {
                let limit = args.parse::<i64>().map_err(|_| {
                    ProtocolError::MalformedArguments {
                        command: "set-capacity",
                        usage: "set-capacity <0-99>",
                    }
                })?;
                Self::SetCapacity { limit }
            }
            "set-private" | "private" => Self::SetPrivate,
            "set-public" | "public" => Self::SetPublic,
            "allow" => {
                let user = parse_user_mention(args).ok_or(
                    ProtocolError::MalformedArguments {
                        command: "allow",
                        usage: "allow <@user>",
                    },
                )?;
                Self::Allow { user }
            }
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };

        Ok(Some(command))
    }

    /// The canonical command name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetTempChannelName { .. } => "set-temp-channel-name",
            Self::SetCategoryName { .. } => "set-category-name",
            Self::SetDefaultCapacity { .. } => "set-default-capacity",
            Self::ShowSettings => "show-settings",
            Self::SetCapacity { .. } => "set-capacity",
            Self::SetPrivate => "set-private",
            Self::SetPublic => "set-public",
            Self::Allow { .. } => "allow",
        }
    }
}

/// Splits `"<kind> <rest…>"`. Both parts must be non-empty.
fn kind_and_rest(args: &str) -> Option<(CategoryKind, String)> {
    let (kind, rest) = args.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    if kind.is_empty() || rest.is_empty() {
        return None;
    }
    Some((CategoryKind::new(kind), rest.to_string()))
}

/// Accepts `<@123>`, `<@!123>` (nickname mention), or a bare `123`.
fn parse_user_mention(arg: &str) -> Option<UserId> {
    let raw = match arg.strip_prefix("<@") {
        Some(inner) => {
            let inner = inner.strip_suffix('>')?;
            inner.strip_prefix('!').unwrap_or(inner)
        }
        None => arg,
    };
    raw.parse::<u64>().ok().map(UserId)
}
