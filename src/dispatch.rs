//! Classifies one completed logical input into an `InputClassification`.

/// The built-in commands recognized without a leading `/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinCommand {
    Help,
    Info,
    Templates,
    Clear,
    Exit,
}

/// The result of classifying one logical input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputClassification {
    /// Empty after trimming; ignored, prompt again.
    Empty,
    /// A single line equal to `\\`; caller should enter multi-line capture.
    MultilineStart,
    /// One of the recognized builtin commands.
    Builtin(BuiltinCommand),
    /// `/name trailing context`.
    Template { name: String, context: String },
    /// An ordinary prompt bound for the agent.
    Prompt(String),
}

impl InputClassification {
    /// Classify one completed, already-joined logical input.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Self::Empty;
        }

        if trimmed == "\\" {
            return Self::MultilineStart;
        }

        match trimmed.to_lowercase().as_str() {
            "help" => return Self::Builtin(BuiltinCommand::Help),
            "info" => return Self::Builtin(BuiltinCommand::Info),
            "templates" => return Self::Builtin(BuiltinCommand::Templates),
            "clear" => return Self::Builtin(BuiltinCommand::Clear),
            "exit" | "quit" => return Self::Builtin(BuiltinCommand::Exit),
            _ => {}
        }

        if let Some(rest) = trimmed.strip_prefix('/') {
            let is_word_start = rest
                .chars()
                .next()
                .map(|c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false);
            if is_word_start {
                let mut parts = rest.splitn(2, char::is_whitespace);
                let name = parts.next().unwrap_or("").to_string();
                let context = parts.next().unwrap_or("").trim().to_string();
                return Self::Template { name, context };
            }
        }

        Self::Prompt(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_ignored() {
        assert_eq!(InputClassification::parse(""), InputClassification::Empty);
        assert_eq!(InputClassification::parse("   "), InputClassification::Empty);
    }

    #[test]
    fn backslash_alone_starts_multiline() {
        assert_eq!(
            InputClassification::parse("\\"),
            InputClassification::MultilineStart
        );
    }

    #[test]
    fn builtins_are_case_insensitive_and_trimmed() {
        assert_eq!(
            InputClassification::parse("  HELP  "),
            InputClassification::Builtin(BuiltinCommand::Help)
        );
        assert_eq!(
            InputClassification::parse("Quit"),
            InputClassification::Builtin(BuiltinCommand::Exit)
        );
        assert_eq!(
            InputClassification::parse("exit"),
            InputClassification::Builtin(BuiltinCommand::Exit)
        );
    }

    #[test]
    fn template_invocation_splits_name_and_context() {
        assert_eq!(
            InputClassification::parse("/review code X"),
            InputClassification::Template {
                name: "review".to_string(),
                context: "code X".to_string()
            }
        );
        assert_eq!(
            InputClassification::parse("/review"),
            InputClassification::Template {
                name: "review".to_string(),
                context: String::new()
            }
        );
    }

    #[test]
    fn slash_without_word_chars_is_ordinary_prompt() {
        assert_eq!(
            InputClassification::parse("/ hello"),
            InputClassification::Prompt("/ hello".to_string())
        );
    }

    #[test]
    fn ordinary_prompt_passes_through_trimmed() {
        assert_eq!(
            InputClassification::parse("  how are you  "),
            InputClassification::Prompt("how are you".to_string())
        );
    }

    #[test]
    fn unknown_template_name_still_classifies_as_template() {
        assert_eq!(
            InputClassification::parse("/unknown"),
            InputClassification::Template {
                name: "unknown".to_string(),
                context: String::new()
            }
        );
    }
}
