//! `agentchat serve`: Start the HTTP gateway.

use agentchat_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    // Check for API key early, give a clear error
    if !config.has_api_key() && !agentchat_providers::is_local(&config.provider) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY    = 'sk-...'");
        eprintln!("    AGENTCHAT_API_KEY = 'sk-...'   (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let tools = agentchat_tools::default_registry(&config.search)?;

    println!("agentchat gateway");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model: {}", config.model);
    println!("   Tool calling: Enabled ({})", tools.names().join(", "));
    println!("   Max iterations: {}", config.agent.max_iterations);

    agentchat_gateway::start(config).await?;

    Ok(())
}
