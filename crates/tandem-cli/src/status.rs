use tandem::config::Settings;
use tandem::providers::factory::ProviderType;

fn mark(ok: bool) -> &'static str {
    if ok {
        "✓"
    } else {
        "✗"
    }
}

/// Human-readable summary of which backends and tools are usable
pub fn config_status(settings: &Settings) -> String {
    let mut lines = vec!["Configuration Status:".to_string(), "=".repeat(50)];

    match settings.preferred_provider() {
        Ok(provider) => lines.push(format!("Preferred provider: {}", provider)),
        Err(e) => lines.push(format!("Error: {}", e)),
    }

    lines.push(String::new());
    lines.push("API Key Status:".to_string());
    for provider in [ProviderType::Anthropic, ProviderType::OpenAi, ProviderType::Gemini] {
        let configured = !settings.api_key(provider).is_empty();
        lines.push(format!("{:<15}: {}", provider.to_string(), mark(configured)));
    }
    lines.push(format!("{:<15}: {}", "exa", mark(!settings.exa_api_key.is_empty())));

    let available = settings.available_providers();
    lines.push(String::new());
    if available.is_empty() {
        lines.push("No API keys configured!".to_string());
        lines.push("Please set API keys in your .env file".to_string());
    } else {
        let names: Vec<String> = available.iter().map(ToString::to_string).collect();
        lines.push(format!("Available providers: {}", names.join(", ")));
    }

    lines.push(String::new());
    lines.push("Tool Status:".to_string());
    lines.push(format!(
        "{:<17}: {}",
        "code_execution",
        mark(settings.enable_code_execution)
    ));
    lines.push(format!(
        "{:<17}: {}",
        "web_search",
        mark(!settings.exa_api_key.is_empty())
    ));
    lines.push(format!("{:<17}: {}", "mcp_browser", mark(settings.enable_mcp)));
    lines.push(format!("{:<17}: {}", "logging", mark(settings.enable_logging)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_status_without_keys() {
        let settings = Settings::from_env_map(HashMap::new()).unwrap();
        let status = config_status(&settings);
        assert!(status.contains("Error: No valid API keys found for any provider"));
        assert!(status.contains("No API keys configured!"));
        assert!(status.contains("code_execution   : ✓"));
        assert!(status.contains("mcp_browser      : ✗"));
    }

    #[test]
    fn test_status_with_keys() {
        let settings = Settings::from_env_map(HashMap::from([(
            "GEMINI_API_KEY".to_string(),
            "g".to_string(),
        )]))
        .unwrap();
        let status = config_status(&settings);
        assert!(status.contains("Preferred provider: gemini"));
        assert!(status.contains("gemini         : ✓"));
        assert!(status.contains("Available providers: gemini"));
    }
}
