use serde::{Deserialize, Serialize};

/// An operating-system signal number, as carried on the `SIGNAL` frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signal(pub i32);

#[cfg(unix)]
impl Signal {
    pub const INTERRUPT: Signal = Signal(libc::SIGINT);
    pub const TERMINATE: Signal = Signal(libc::SIGTERM);
    pub const HANGUP: Signal = Signal(libc::SIGHUP);
    pub const QUIT: Signal = Signal(libc::SIGQUIT);
    pub const KILL: Signal = Signal(libc::SIGKILL);
    pub const USER1: Signal = Signal(libc::SIGUSR1);
    pub const USER2: Signal = Signal(libc::SIGUSR2);
}

impl Signal {
    /// Raw signal number.
    pub fn number(self) -> i32 {
        self.0
    }
}

impl From<i32> for Signal {
    fn from(number: i32) -> Self {
        Self(number)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "signal {}", self.0)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn constants_match_libc() {
        assert_eq!(Signal::INTERRUPT.number(), libc::SIGINT);
        assert_eq!(Signal::KILL, Signal::from(libc::SIGKILL));
        assert_eq!(Signal::TERMINATE.to_string(), format!("signal {}", libc::SIGTERM));
    }

    #[test]
    #[cfg(feature = "json")]
    fn serializes_as_bare_number() {
        use framemux_frame::{Encoding, JsonEncoding};

        let bytes = JsonEncoding.encode(&Signal(15)).unwrap();
        assert_eq!(bytes, b"15");
        let decoded: Signal = JsonEncoding.decode(&bytes).unwrap();
        assert_eq!(decoded, Signal(15));
    }
}
