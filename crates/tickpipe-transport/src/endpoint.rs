use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Well-known name of the game-state channel.
pub const DEFAULT_CHANNEL_NAME: &str = "TickPipeGameState";

/// Socket path used in place of the named pipe on Unix platforms.
pub const DEFAULT_UNIX_PATH: &str = "/tmp/tickpipe-game-state.sock";

/// Where the counterpart's channel lives.
///
/// Textual form:
/// - `pipe:<name>`: Windows named pipe `\\.\pipe\<name>`
/// - `unix:<path>`: Unix domain socket
/// - `tcp:<host:port>`: TCP loopback listener
///
/// A value without a scheme is a pipe name on Windows and a socket path
/// everywhere else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    NamedPipe(String),
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl Endpoint {
    /// The endpoint used when none is configured.
    pub fn default_for_platform() -> Self {
        if cfg!(windows) {
            Endpoint::NamedPipe(DEFAULT_CHANNEL_NAME.to_string())
        } else {
            Endpoint::Unix(PathBuf::from(DEFAULT_UNIX_PATH))
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match self {
            Endpoint::NamedPipe(_) => "named-pipe",
            Endpoint::Unix(_) => "unix-domain-socket",
            Endpoint::Tcp(_) => "tcp-loopback",
        }
    }

    /// Full OS path of a named pipe.
    pub fn pipe_path(name: &str) -> String {
        if name.starts_with(r"\\") {
            name.to_string()
        } else {
            format!(r"\\.\pipe\{name}")
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::default_for_platform()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::NamedPipe(name) => write!(f, "pipe:{name}"),
            Endpoint::Unix(path) => write!(f, "unix:{}", path.display()),
            Endpoint::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}

/// Error returned when an endpoint string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid endpoint {input:?}: {reason}")]
pub struct ParseEndpointError {
    input: String,
    reason: &'static str,
}

impl FromStr for Endpoint {
    type Err = ParseEndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ParseEndpointError {
            input: s.to_string(),
            reason,
        };

        let s_trimmed = s.trim();
        if s_trimmed.is_empty() {
            return Err(invalid("endpoint must not be empty"));
        }

        if let Some(name) = s_trimmed.strip_prefix("pipe:") {
            if name.is_empty() {
                return Err(invalid("pipe name must not be empty"));
            }
            return Ok(Endpoint::NamedPipe(name.to_string()));
        }
        if let Some(path) = s_trimmed.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(invalid("socket path must not be empty"));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if let Some(addr) = s_trimmed.strip_prefix("tcp:") {
            let addr = addr
                .parse::<SocketAddr>()
                .map_err(|_| invalid("expected tcp:<ip>:<port>"))?;
            return Ok(Endpoint::Tcp(addr));
        }

        if cfg!(windows) {
            Ok(Endpoint::NamedPipe(s_trimmed.to_string()))
        } else {
            Ok(Endpoint::Unix(PathBuf::from(s_trimmed)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_explicit_schemes() {
        assert_eq!(
            "pipe:CivState".parse::<Endpoint>().unwrap(),
            Endpoint::NamedPipe("CivState".to_string())
        );
        assert_eq!(
            "unix:/tmp/a.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/tmp/a.sock"))
        );
        assert_eq!(
            "tcp:127.0.0.1:7777".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp("127.0.0.1:7777".parse().unwrap())
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("pipe:".parse::<Endpoint>().is_err());
        assert!("unix:".parse::<Endpoint>().is_err());
        assert!("tcp:localhost".parse::<Endpoint>().is_err());
    }

    #[test]
    #[cfg(unix)]
    fn bare_value_is_socket_path_on_unix() {
        assert_eq!(
            "/run/game.sock".parse::<Endpoint>().unwrap(),
            Endpoint::Unix(PathBuf::from("/run/game.sock"))
        );
    }

    #[test]
    fn display_matches_parse() {
        for text in ["pipe:CivState", "unix:/tmp/a.sock", "tcp:127.0.0.1:9000"] {
            let endpoint: Endpoint = text.parse().unwrap();
            assert_eq!(endpoint.to_string(), text);
        }
    }

    #[test]
    fn pipe_path_is_prefixed_once() {
        assert_eq!(Endpoint::pipe_path("Game"), r"\\.\pipe\Game");
        assert_eq!(Endpoint::pipe_path(r"\\.\pipe\Game"), r"\\.\pipe\Game");
    }

    #[test]
    fn default_endpoint_names_the_game_state_channel() {
        let endpoint = Endpoint::default();
        #[cfg(unix)]
        assert_eq!(endpoint, Endpoint::Unix(PathBuf::from(DEFAULT_UNIX_PATH)));
        #[cfg(windows)]
        assert_eq!(
            endpoint,
            Endpoint::NamedPipe(DEFAULT_CHANNEL_NAME.to_string())
        );
    }
}
