//! `aura status` — print the effective configuration.

pub fn run(config_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    println!("Aura configuration");
    println!("  server:      {}:{}", config.server.host, config.server.port);
    println!("  database:    {}", config.database.path);
    println!("  model:       {}", config.default_model);
    println!("  temperature: {}", config.default_temperature);
    println!(
        "  rate limit:  {} requests / {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    println!(
        "  provider:    {}",
        if config.has_api_key() {
            "Gemini (key configured)"
        } else {
            "mock engine (no API key)"
        }
    );

    Ok(())
}
