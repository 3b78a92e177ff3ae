//! Prompt text for the selection policy.

use codewright_core::tool::ToolSpec;

pub const AGENT_PREAMBLE: &str = "You are an assistant that answers questions about a codebase. \
All of the user's questions are about this particular codebase, and you have tools that you can \
use to look things up in it. Work step by step: choose a single tool at a time, and when you have \
what you need, answer the user directly. Do not ask the user for file paths or file names; use \
the tools to find them.";

pub const RESPONSE_FORMAT: &str = r#"Reply with exactly one JSON object and nothing else, in one of these two forms.

To call a tool:
{"action": "call_tool", "tool": "<tool name>", "arguments": {"<param>": <value>}, "reason": "<why this tool, in one sentence>"}

To answer the user:
{"action": "respond", "response": "<your answer>"}

Put literal parameter values in "arguments"; never refer to other values. Keep answers short and put any code in a fenced code block inside the response string."#;

pub const TOOL_RESPONSE_FOLLOWUP: &str = "If you can answer the complete question, do so using the \
output from the tool response. If you cannot answer the complete question, choose a tool.";

pub const CORRECTIVE_PROMPT: &str = "Your previous reply could not be understood. Reply again with \
exactly one JSON object using either the \"call_tool\" or the \"respond\" form described above.";

/// Render the tool catalog shown to the model.
pub fn tool_catalog(tools: &[ToolSpec]) -> String {
    if tools.is_empty() {
        return "No tools are available; answer directly.".into();
    }

    let mut out = String::from("Available tools:\n");
    for spec in tools {
        out.push_str(&format!("\n- {}: {}\n", spec.name, spec.description));
        for param in &spec.params {
            let requirement = match (param.required, &param.default) {
                (true, _) => "required".to_string(),
                (false, Some(default)) => format!("optional, default {default}"),
                (false, None) => "optional".to_string(),
            };
            out.push_str(&format!(
                "    - {} ({}, {}): {}\n",
                param.name,
                param.kind.as_str(),
                requirement,
                param.description
            ));
        }
    }
    out
}

/// The full system prompt for one decision.
pub fn system_prompt(preamble: &str, tools: &[ToolSpec]) -> String {
    format!("{preamble}\n\n{}\n\n{RESPONSE_FORMAT}", tool_catalog(tools))
}

/// How a tool result is framed when replayed to the model.
pub fn tool_response(tool_name: &str, text: &str) -> String {
    format!("### Tool Response ({tool_name}) ###\n{text}\n\n{TOOL_RESPONSE_FOLLOWUP}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use codewright_core::tool::{ParamKind, ParamSpec};

    #[test]
    fn catalog_lists_params_with_defaults() {
        let spec = ToolSpec::new("read_file", "Read lines of a file")
            .param(ParamSpec::required("path", ParamKind::String, "File path"))
            .param(ParamSpec::optional("start_line", ParamKind::Integer, "First line", 1));
        let catalog = tool_catalog(&[spec]);
        assert!(catalog.contains("- read_file: Read lines of a file"));
        assert!(catalog.contains("path (string, required): File path"));
        assert!(catalog.contains("start_line (integer, optional, default 1): First line"));
    }

    #[test]
    fn empty_catalog() {
        assert!(tool_catalog(&[]).contains("No tools"));
    }

    #[test]
    fn system_prompt_has_all_parts() {
        let prompt = system_prompt(AGENT_PREAMBLE, &[]);
        assert!(prompt.starts_with("You are an assistant"));
        assert!(prompt.contains("\"action\": \"call_tool\""));
    }
}
