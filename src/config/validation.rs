use crate::config::types::{
    ChunkingConfig, Config, CrawlerConfig, ExtractionConfig, LlmConfig, StorageConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_chunking_config(&config.chunking)?;
    validate_extraction_config(&config.extraction)?;
    validate_llm_config(&config.llm)?;

    if config.embedding.batch_size == 0 {
        return Err(ConfigError::Validation(
            "embedding batch_size must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.concurrency < 1 || config.concurrency > 50 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 50, got {}",
            config.concurrency
        )));
    }

    if config.max_parallel_domains < 1 || config.max_parallel_domains > 20 {
        return Err(ConfigError::Validation(format!(
            "max_parallel_domains must be between 1 and 20, got {}",
            config.max_parallel_domains
        )));
    }

    if config.politeness_delay_min_ms > config.politeness_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "politeness_delay_min_ms ({}) must not exceed politeness_delay_max_ms ({})",
            config.politeness_delay_min_ms, config.politeness_delay_max_ms
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    // The name doubles as the robots.txt agent token
    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.fallback_dir.is_empty() {
        return Err(ConfigError::Validation(
            "fallback_dir cannot be empty".to_string(),
        ));
    }

    if config.page_limit == 0 {
        return Err(ConfigError::Validation(
            "page_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_chunking_config(config: &ChunkingConfig) -> Result<(), ConfigError> {
    if config.target_tokens == 0 {
        return Err(ConfigError::Validation(
            "target_tokens must be >= 1".to_string(),
        ));
    }

    if config.overlap_tokens >= config.target_tokens {
        return Err(ConfigError::Validation(format!(
            "overlap_tokens ({}) must be smaller than target_tokens ({})",
            config.overlap_tokens, config.target_tokens
        )));
    }

    if config.min_tokens > config.target_tokens {
        return Err(ConfigError::Validation(format!(
            "min_tokens ({}) must not exceed target_tokens ({})",
            config.min_tokens, config.target_tokens
        )));
    }

    Ok(())
}

fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.max_concurrent == 0 {
        return Err(ConfigError::Validation(
            "max_concurrent must be >= 1".to_string(),
        ));
    }

    if config.max_retries == 0 {
        return Err(ConfigError::Validation(
            "max_retries must be >= 1".to_string(),
        ));
    }

    if config.chars_per_chunk == 0 || config.char_limit == 0 {
        return Err(ConfigError::Validation(
            "chars_per_chunk and char_limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm_config(config: &LlmConfig) -> Result<(), ConfigError> {
    Url::parse(&config.api_base)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api_base: {}", e)))?;

    if config.api_key_env.is_empty() {
        return Err(ConfigError::Validation(
            "api_key_env cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }

    #[test]
    fn test_chunking_overlap_must_be_below_target() {
        let config = ChunkingConfig {
            target_tokens: 100,
            overlap_tokens: 100,
            min_tokens: 10,
        };
        assert!(validate_chunking_config(&config).is_err());

        let config = ChunkingConfig {
            target_tokens: 100,
            overlap_tokens: 20,
            min_tokens: 10,
        };
        assert!(validate_chunking_config(&config).is_ok());
    }

    #[test]
    fn test_crawler_delay_bounds() {
        let config = CrawlerConfig {
            politeness_delay_min_ms: 600,
            politeness_delay_max_ms: 500,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());
        assert!(validate_crawler_config(&CrawlerConfig::default()).is_ok());
    }

    #[test]
    fn test_crawler_name_charset() {
        let config = UserAgentConfig {
            crawler_name: "Lead Bot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com".to_string(),
            contact_email: "bot@example.com".to_string(),
        };
        assert!(validate_user_agent_config(&config).is_err());
    }
}
