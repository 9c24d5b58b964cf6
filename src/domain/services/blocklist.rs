use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Administrative commands a shared playground instance must never run.
static BLOCKED_COMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "FLUSHALL",
        "FLUSHDB",
        "DUMP",
        "ABORT",
        "AUTH",
        "CONFIG",
        "SAVE",
        "BGSAVE",
        "BGREWRITEAOF",
        "RESTORE",
        "MULTI",
        "EXEC",
        "DISCARD",
        "QWATCH",
        "QUNWATCH",
        "LATENCY",
        "CLIENT",
        "SLEEP",
        "PERSIST",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy)]
pub struct CommandBlocklist {
    enabled: bool,
}

impl CommandBlocklist {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Case-insensitive membership check; always false when disabled.
    pub fn is_blocked(&self, command: &str) -> bool {
        self.enabled && BLOCKED_COMMANDS.contains(command.trim().to_ascii_uppercase().as_str())
    }
}

impl Default for CommandBlocklist {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_admin_commands_in_any_case() {
        let blocklist = CommandBlocklist::default();
        assert!(blocklist.is_blocked("FLUSHALL"));
        assert!(blocklist.is_blocked("config"));
        assert!(blocklist.is_blocked("Multi"));
        assert!(!blocklist.is_blocked("GET"));
        assert!(!blocklist.is_blocked("HGETALL"));
    }

    #[test]
    fn disabled_blocklist_lets_everything_through() {
        assert!(!CommandBlocklist::disabled().is_blocked("FLUSHALL"));
    }
}
