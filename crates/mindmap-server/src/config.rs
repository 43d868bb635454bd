//! Server configuration from the environment

use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Which model backend generates mind maps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LlmBackend {
    OpenAi,
    Ollama,
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Invalid {
                name: "LLM_PROVIDER",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BillingConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
    pub price_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub production: bool,
    pub bind_addr: String,
    pub database_url: String,
    pub llm: LlmBackend,
    pub static_dir: String,
    pub billing: BillingConfig,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(var)
    }

    /// Build from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let production = lookup("APP_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        let llm = lookup("LLM_PROVIDER")
            .map_or(Ok(LlmBackend::OpenAi), |value| value.parse())?;

        if llm == LlmBackend::OpenAi && lookup("OPENAI_API_KEY").is_none() {
            return Err(ConfigError::Missing("OPENAI_API_KEY"));
        }

        let billing = BillingConfig {
            secret_key: lookup("STRIPE_SECRET_KEY"),
            webhook_secret: lookup("STRIPE_WEBHOOK_SECRET"),
            price_id: lookup("STRIPE_MONTHLY_PRICE_ID"),
        };
        if production {
            if billing.secret_key.is_none() {
                return Err(ConfigError::Missing("STRIPE_SECRET_KEY"));
            }
            if billing.webhook_secret.is_none() {
                return Err(ConfigError::Missing("STRIPE_WEBHOOK_SECRET"));
            }
            if billing.price_id.is_none() {
                return Err(ConfigError::Missing("STRIPE_MONTHLY_PRICE_ID"));
            }
        }

        Ok(Self {
            production,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://mindmap.db?mode=rwc".into()),
            llm,
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "static".into()),
            billing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_development_defaults() {
        let config = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert!(!config.production);
        assert_eq!(config.llm, LlmBackend::OpenAi);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert!(config.billing.secret_key.is_none());
    }

    #[test]
    fn test_openai_requires_key() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing("OPENAI_API_KEY"))));
        assert!(config(&[("LLM_PROVIDER", "ollama")]).is_ok());
        assert!(matches!(
            config(&[("LLM_PROVIDER", "gpt")]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_production_requires_billing() {
        let err = config(&[("APP_ENV", "production"), ("LLM_PROVIDER", "ollama")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("STRIPE_SECRET_KEY")));

        let ok = config(&[
            ("APP_ENV", "production"),
            ("LLM_PROVIDER", "ollama"),
            ("STRIPE_SECRET_KEY", "sk_live"),
            ("STRIPE_WEBHOOK_SECRET", "whsec"),
            ("STRIPE_MONTHLY_PRICE_ID", "price_1"),
        ])
        .unwrap();
        assert!(ok.production);
    }
}
