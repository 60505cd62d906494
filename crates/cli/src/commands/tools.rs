//! `agentchat tools`: List registered tools.

use agentchat_config::AppConfig;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let registry = agentchat_tools::default_registry(&config.search)?;

    println!("Registered tools ({}):", registry.len());
    for definition in registry.definitions() {
        println!();
        println!("  {}", definition.name);
        println!("    {}", definition.description);
        if let Some(required) = definition.parameters["required"].as_array() {
            let names: Vec<_> = required.iter().filter_map(|v| v.as_str()).collect();
            println!("    required: {}", names.join(", "));
        }
    }

    if config.search.api_key.is_none() {
        println!();
        println!("  note: web_search needs TAVILY_API_KEY");
    }

    Ok(())
}
