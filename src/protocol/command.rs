//! Command definitions
//!
//! A command line is the argv of one invocation: the command name
//! followed by its arguments, each an opaque byte string. The set of
//! commands the server knows is closed and fixed at compile time.

use bytes::Bytes;

/// Name followed by arguments, binary-safe
pub type CommandLine = Vec<Bytes>;

/// Build a command line from anything byte-like
pub fn command_line<I, T>(parts: I) -> CommandLine
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    parts
        .into_iter()
        .map(|p| Bytes::copy_from_slice(p.as_ref()))
        .collect()
}

/// The invocation that switches the current namespace
pub fn select_command(namespace: usize) -> CommandLine {
    vec![
        Bytes::from_static(b"SELECT"),
        Bytes::from(namespace.to_string()),
    ]
}

/// Known commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Ping,
    Echo,
    Select,
    Set,
    Get,
    Del,
    Exists,
    DbSize,
    FlushDb,
    Shutdown,
}

impl CommandKind {
    /// Look up a command by name, ignoring ASCII case
    pub fn lookup(name: &[u8]) -> Option<Self> {
        const TABLE: &[(&str, CommandKind)] = &[
            ("ping", CommandKind::Ping),
            ("echo", CommandKind::Echo),
            ("select", CommandKind::Select),
            ("set", CommandKind::Set),
            ("get", CommandKind::Get),
            ("del", CommandKind::Del),
            ("exists", CommandKind::Exists),
            ("dbsize", CommandKind::DbSize),
            ("flushdb", CommandKind::FlushDb),
            ("shutdown", CommandKind::Shutdown),
        ];

        TABLE
            .iter()
            .find(|(n, _)| n.as_bytes().eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
    }

    /// Lower-case command name
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Ping => "ping",
            CommandKind::Echo => "echo",
            CommandKind::Select => "select",
            CommandKind::Set => "set",
            CommandKind::Get => "get",
            CommandKind::Del => "del",
            CommandKind::Exists => "exists",
            CommandKind::DbSize => "dbsize",
            CommandKind::FlushDb => "flushdb",
            CommandKind::Shutdown => "shutdown",
        }
    }

    /// Allowed argc including the name; negative means "at least"
    pub fn arity(&self) -> i32 {
        match self {
            CommandKind::Ping => -1,
            CommandKind::Echo => 2,
            CommandKind::Select => 2,
            CommandKind::Set => 3,
            CommandKind::Get => 2,
            CommandKind::Del => -2,
            CommandKind::Exists => -2,
            CommandKind::DbSize => 1,
            CommandKind::FlushDb => 1,
            CommandKind::Shutdown => 1,
        }
    }

    /// Whether an accepted invocation must be recorded in the log
    pub fn is_write(&self) -> bool {
        matches!(self, CommandKind::Set | CommandKind::Del | CommandKind::FlushDb)
    }

    /// Check an argc against the arity rule
    pub fn accepts(&self, argc: usize) -> bool {
        let arity = self.arity();
        if arity >= 0 {
            argc == arity as usize
        } else {
            argc >= arity.unsigned_abs() as usize
        }
    }
}
