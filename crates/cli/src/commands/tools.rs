//! `codewright tools` — List the enabled tools and their parameters.

use std::path::Path;

use crate::runtime::Runtime;

pub async fn run(repo: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open(repo)?;
    let registry = runtime.registry()?;

    println!("  {} tools enabled\n", registry.len());
    for spec in registry.list() {
        println!("  {}", spec.name);
        println!("    {}", spec.description);
        for param in &spec.params {
            let default = param
                .default
                .as_ref()
                .map(|d| format!(" = {d}"))
                .unwrap_or_default();
            let required = if param.required { ", required" } else { "" };
            println!(
                "    - {}: {}{}{}  {}",
                param.name,
                param.kind.as_str(),
                required,
                default,
                param.description
            );
        }
        println!();
    }
    Ok(())
}
