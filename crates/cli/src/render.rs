//! Terminal rendering of dispatch results.

use parley_types::{CommandResult, DisplayMode};

pub fn render_result(result: &CommandResult) -> String {
    let mut lines = Vec::new();

    if let Some(conversion) = &result.conversion {
        lines.push(format!(
            "-> {} {} ({:?}, confidence {:.2})",
            conversion.command,
            conversion.args.join(" "),
            conversion.source,
            conversion.confidence
        ));
    }

    if !result.success {
        lines.push(format!("error: {}", result.error.as_deref().unwrap_or("command failed")));
        if !result.suggested_next_commands.is_empty() {
            lines.push(format!("did you mean: {}", result.suggested_next_commands.join(", ")));
        }
        return lines.join("\n");
    }

    if let Some(message) = &result.message {
        lines.push(message.clone());
    }
    if let Some(data) = &result.data
        && result.display_mode != DisplayMode::None
    {
        let rendered = match result.display_mode {
            DisplayMode::Json => serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
            _ => data.to_string(),
        };
        lines.push(rendered);
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_lists_suggestions() {
        let result = CommandResult::failure("unknown command '@git:statu'").with_suggestions(vec!["@git:status".into(), "@git:stash".into()]);
        assert_eq!(
            render_result(&result),
            "error: unknown command '@git:statu'\ndid you mean: @git:status, @git:stash"
        );
    }

    #[test]
    fn json_payload_is_pretty_printed() {
        let result = CommandResult::json(serde_json::json!({"a": 1})).with_message("done");
        assert_eq!(render_result(&result), "done\n{\n  \"a\": 1\n}");
    }
}
