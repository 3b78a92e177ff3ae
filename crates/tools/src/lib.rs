//! Built-in tool implementations for Codewright.
//!
//! Each tool answers one kind of question about the repository: general
//! questions via the retrieval index, locating files, reading code,
//! writing docstrings, interpreting linter output, and ranking functions
//! by complexity.

pub mod codebase_qa;
pub mod complexity_report;
pub mod context;
pub mod find_files;
pub mod generate_docstrings;
pub mod path;
pub mod read_file;
pub mod run_linter;

#[cfg(test)]
pub(crate) mod test_helpers;

use codewright_config::ToolConfig;
use codewright_core::error::Error;
use codewright_core::tool::{Tool, ToolRegistry};
use std::sync::Arc;
use tracing::debug;

pub use context::ToolContext;

/// Names of every built-in tool, in default catalog order.
pub const BUILTIN_TOOL_NAMES: &[&str] = &[
    "codebase_qa",
    "find_files",
    "read_file",
    "generate_docstrings",
    "run_linter",
    "complexity_report",
];

/// Instantiate every built-in tool over a shared context.
pub fn builtin_tools(ctx: Arc<ToolContext>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(codebase_qa::CodebaseQaTool::new(ctx.clone())),
        Arc::new(find_files::FindFilesTool::new(ctx.clone())),
        Arc::new(read_file::ReadFileTool::new(ctx.clone())),
        Arc::new(generate_docstrings::GenerateDocstringsTool::new(ctx.clone())),
        Arc::new(run_linter::RunLinterTool::new(ctx.clone())),
        Arc::new(complexity_report::ComplexityReportTool::new(ctx)),
    ]
}

/// Build the tool registry from the tool configuration.
///
/// An empty `manifest` enables every built-in tool. Otherwise only the
/// listed, enabled tools are registered, in manifest order, with any
/// description override applied. Naming an unknown tool is a configuration
/// error.
pub fn default_registry(ctx: Arc<ToolContext>, manifest: &[ToolConfig]) -> Result<ToolRegistry, Error> {
    let tools = builtin_tools(ctx);
    let mut registry = ToolRegistry::new();

    if manifest.is_empty() {
        for tool in tools {
            registry.register(tool)?;
        }
        return Ok(registry);
    }

    for entry in manifest {
        let tool = tools
            .iter()
            .find(|t| t.spec().name == entry.name)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "unknown tool '{}' in tool configuration (known tools: {})",
                    entry.name,
                    BUILTIN_TOOL_NAMES.join(", ")
                ),
            })?;

        if !entry.enabled {
            debug!(tool = %entry.name, "Tool disabled by configuration");
            continue;
        }

        let mut spec = tool.spec();
        if let Some(description) = &entry.description {
            spec.description = description.clone();
        }
        registry.register_as(tool.clone(), spec)?;
    }

    Ok(registry)
}
