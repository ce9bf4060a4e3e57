//! Syntax rendering for help output and error hints.

use crate::argument::ArgumentSpec;

/// Render argument descriptors as `give <player> <item> [amount] [--silent]`.
pub fn command_syntax(arguments: &[ArgumentSpec]) -> String {
    arguments
        .iter()
        .map(ArgumentSpec::label)
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One help line: `syntax - description`, or just the syntax.
pub fn help_line(syntax: &str, description: Option<&str>) -> String {
    match description {
        Some(description) if !description.is_empty() => format!("{} - {}", syntax, description),
        _ => syntax.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::FlagSpec;
    use crate::parser::TypeTag;

    #[test]
    fn test_command_syntax() {
        let arguments = vec![
            ArgumentSpec::literal("give"),
            ArgumentSpec::required("player", TypeTag::STRING),
            ArgumentSpec::optional("amount", TypeTag::INTEGER),
            ArgumentSpec::flags("flags").flag(FlagSpec::presence("silent")),
        ];
        assert_eq!(command_syntax(&arguments), "give <player> [amount] [--silent]");
    }

    #[test]
    fn test_help_line() {
        assert_eq!(help_line("ping", Some("Check latency")), "ping - Check latency");
        assert_eq!(help_line("ping", Some("")), "ping");
        assert_eq!(help_line("ping", None), "ping");
    }
}
