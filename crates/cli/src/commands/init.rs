//! `codewright init` — Write the default configuration.

use codewright_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("Codewright — Setup");
    println!("==================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    } else {
        println!("Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\nConfig already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("Created config.toml at: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set an API key: export OPENAI_API_KEY=sk-...");
    println!("     (or set provider = \"ollama\" in the config to run locally)");
    println!("  2. Index a repository: codewright index build --repo path/to/repo");
    println!("  3. Ask questions:      codewright chat --repo path/to/repo");
    println!("\nTo restrict or re-describe tools, add [[tools]] entries to the config");
    println!("or to {}.", config_dir.join("tools.toml").display());
    Ok(())
}
