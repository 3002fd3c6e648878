use super::{
    anthropic::AnthropicProvider, base::Provider, configs::ProviderConfig,
    gemini::GeminiProvider, openai::OpenAiProvider,
};
use crate::errors::ProviderResult;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

#[derive(
    EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderType {
    Anthropic,
    OpenAi,
    Gemini,
}

pub fn get_provider(config: ProviderConfig) -> ProviderResult<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Box::new(AnthropicProvider::new(anthropic_config)?))
        }
        ProviderConfig::Gemini(gemini_config) => Ok(Box::new(GeminiProvider::new(gemini_config)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::configs::{GeminiProviderConfig, DEFAULT_TIMEOUT};
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_provider_type_tags() {
        assert_eq!(ProviderType::from_str("openai").unwrap(), ProviderType::OpenAi);
        assert_eq!(ProviderType::from_str("Anthropic").unwrap(), ProviderType::Anthropic);
        assert!(ProviderType::from_str("ollama").is_err());
        let tags: Vec<String> = ProviderType::iter().map(|p| p.to_string()).collect();
        assert_eq!(tags, vec!["anthropic", "openai", "gemini"]);
    }

    #[test]
    fn test_get_provider_reports_model_info() {
        let provider = get_provider(ProviderConfig::Gemini(GeminiProviderConfig {
            host: "http://localhost".to_string(),
            api_key: "key".to_string(),
            model: "gemini-1.5-pro".to_string(),
            temperature: Some(0.2),
            max_tokens: Some(100),
            timeout: DEFAULT_TIMEOUT,
        }))
        .unwrap();
        let info = provider.info();
        assert_eq!(info.provider, ProviderType::Gemini);
        assert_eq!(info.model_name, "gemini-1.5-pro");
        assert_eq!(info.temperature, Some(0.2));
    }
}
