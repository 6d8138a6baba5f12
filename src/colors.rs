//! Semantic color roles and ANSI rendering.

use crate::config::ColorsConfig;

/// One of the six semantic color roles, or the reset sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
    System,
    Error,
    Success,
    Dim,
}

/// Maps semantic roles to escape sequences and wraps text with them,
/// eliding escapes entirely when stdout is not a TTY.
pub struct Painter {
    colors: ColorsConfig,
    enabled: bool,
}

impl Painter {
    pub fn new(colors: ColorsConfig) -> Self {
        Self {
            colors,
            enabled: atty::is(atty::Stream::Stdout),
        }
    }

    /// Construct a painter with explicit TTY detection, for testing.
    pub fn with_enabled(colors: ColorsConfig, enabled: bool) -> Self {
        Self { colors, enabled }
    }

    fn code(name: &str) -> &'static str {
        match name {
            "bright white" => "\x1b[97m",
            "bright blue" => "\x1b[94m",
            "bright red" => "\x1b[91m",
            "bright green" => "\x1b[92m",
            "yellow" => "\x1b[33m",
            "dim" => "\x1b[2m",
            "reset" => "\x1b[0m",
            _ => "",
        }
    }

    fn escape_for(&self, role: Role) -> &str {
        let name = match role {
            Role::User => &self.colors.user,
            Role::Agent => &self.colors.agent,
            Role::System => &self.colors.system,
            Role::Error => &self.colors.error,
            Role::Success => &self.colors.success,
            Role::Dim => &self.colors.dim,
        };
        Self::code(name)
    }

    /// Wrap `text` with the role's escape sequence and the reset sequence.
    pub fn paint(&self, role: Role, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        format!("{}{}{}", self.escape_for(role), text, Self::code("reset"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> ColorsConfig {
        ColorsConfig {
            user: "bright white".into(),
            agent: "bright blue".into(),
            system: "yellow".into(),
            error: "bright red".into(),
            success: "bright green".into(),
            dim: "dim".into(),
            reset: "reset".into(),
        }
    }

    #[test]
    fn non_tty_elides_escapes() {
        let painter = Painter::with_enabled(colors(), false);
        assert_eq!(painter.paint(Role::Error, "oops"), "oops");
    }

    #[test]
    fn tty_wraps_with_escape_and_reset() {
        let painter = Painter::with_enabled(colors(), true);
        let painted = painter.paint(Role::Error, "oops");
        assert!(painted.starts_with("\x1b[91m"));
        assert!(painted.ends_with("\x1b[0m"));
        assert!(painted.contains("oops"));
    }
}
