//! Provider routing from `--provider`/`--model` (spec §6 "Provider routing").

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Mistral,
    Cerebras,
    Vercel,
    BrowserUse,
    Aws,
    Oci,
    Ollama,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderRoutingError {
    #[error("--provider oci requires an explicit config")]
    OciRequiresExplicitConfig,
    #[error("--provider {0} requires an explicit --model")]
    RequiresExplicitModel(String),
}

/// Resolves the effective provider and model string (with any provider
/// prefix stripped) from the raw CLI flags.
pub fn resolve(provider: Option<&str>, model: Option<&str>) -> Result<(Provider, Option<String>), ProviderRoutingError> {
    if let Some(model) = model {
        if let Some(stripped) = model.strip_prefix("claude") {
            return Ok((Provider::Anthropic, Some(format!("claude{stripped}"))));
        }
        if let Some(stripped) = model.strip_prefix("gpt") {
            return Ok((Provider::OpenAi, Some(format!("gpt{stripped}"))));
        }
        if let Some(stripped) = model.strip_prefix("mistral") {
            return Ok((Provider::Mistral, Some(format!("mistral{stripped}"))));
        }
        if let Some(stripped) = model.strip_prefix("cerebras:") {
            return Ok((Provider::Cerebras, Some(stripped.to_string())));
        }
        if let Some(stripped) = model.strip_prefix("vercel:") {
            return Ok((Provider::Vercel, Some(stripped.to_string())));
        }
        if let Some(stripped) = model.strip_prefix("bu-") {
            return Ok((Provider::BrowserUse, Some(format!("bu-{stripped}"))));
        }
        if let Some(stripped) = model.strip_prefix("oci:") {
            let _ = stripped;
            return Err(ProviderRoutingError::OciRequiresExplicitConfig);
        }
    }

    if let Some(provider) = provider {
        return match provider {
            "anthropic" => Ok((Provider::Anthropic, model.map(str::to_string))),
            "openai" => Ok((Provider::OpenAi, model.map(str::to_string))),
            "mistral" => Ok((Provider::Mistral, model.map(str::to_string))),
            "cerebras" => Ok((Provider::Cerebras, model.map(str::to_string))),
            "vercel" => Ok((Provider::Vercel, model.map(str::to_string))),
            "browser-use" => Ok((Provider::BrowserUse, model.map(str::to_string))),
            "aws" => match model {
                Some(m) => Ok((Provider::Aws, Some(m.to_string()))),
                None => Err(ProviderRoutingError::RequiresExplicitModel("aws".to_string())),
            },
            "oci" => match model {
                Some(m) => Ok((Provider::Oci, Some(m.to_string()))),
                None => Err(ProviderRoutingError::RequiresExplicitModel("oci".to_string())),
            },
            other => Ok((Provider::BrowserUse, Some(other.to_string()))),
        };
    }

    if has_any_known_credentials() {
        return Ok((Provider::BrowserUse, None));
    }
    Ok((Provider::Ollama, Some("qwen2.5:latest".to_string())))
}

fn has_any_known_credentials() -> bool {
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "ANTHROPIC_API_KEY",
        "GOOGLE_API_KEY",
        "DEEPSEEK_API_KEY",
        "GROQ_API_KEY",
        "OPENROUTER_API_KEY",
        "AZURE_OPENAI_API_KEY",
        "MISTRAL_API_KEY",
        "CEREBRAS_API_KEY",
        "VERCEL_API_KEY",
        "AWS_ACCESS_KEY_ID",
        "AWS_PROFILE",
        "BROWSER_USE_API_KEY",
    ];
    KEYS.iter().any(|key| std::env::var(key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_prefix_routes_to_anthropic() {
        let (provider, model) = resolve(None, Some("claude-3-5-sonnet")).unwrap();
        assert_eq!(provider, Provider::Anthropic);
        assert_eq!(model.as_deref(), Some("claude-3-5-sonnet"));
    }

    #[test]
    fn cerebras_prefix_strips_and_routes() {
        let (provider, model) = resolve(None, Some("cerebras:llama3-70b")).unwrap();
        assert_eq!(provider, Provider::Cerebras);
        assert_eq!(model.as_deref(), Some("llama3-70b"));
    }

    #[test]
    fn oci_model_prefix_requires_explicit_config() {
        let err = resolve(None, Some("oci:whatever")).unwrap_err();
        assert!(matches!(err, ProviderRoutingError::OciRequiresExplicitConfig));
    }

    #[test]
    fn aws_provider_without_model_errors() {
        let err = resolve(Some("aws"), None).unwrap_err();
        assert!(matches!(err, ProviderRoutingError::RequiresExplicitModel(_)));
    }
}
