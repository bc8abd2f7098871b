use std::collections::HashMap;

use crate::error::GatewayError;

/// Validates configuration values for consistency before the process
/// finishes starting up.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_bind_address(address: &str) -> Result<(), GatewayError> {
        if address.is_empty() {
            return Err(GatewayError::Validation("bind address cannot be empty".to_string()));
        }
        if !address.contains(':') {
            return Err(GatewayError::Validation(
                "bind address must be in host:port format".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_redis_url(url: &str) -> Result<(), GatewayError> {
        if url.is_empty() {
            return Err(GatewayError::Validation("redis url cannot be empty".to_string()));
        }
        if !url.starts_with("redis://") && !url.starts_with("rediss://") {
            return Err(GatewayError::Validation(
                "redis url must start with 'redis://' or 'rediss://'".to_string(),
            ));
        }
        Ok(())
    }

    /// Every registered service needs at least one instance, or
    /// round-robin selection has nothing to select between.
    pub fn validate_service_registry(registry: &HashMap<String, Vec<String>>) -> Result<(), GatewayError> {
        if registry.is_empty() {
            return Err(GatewayError::Validation("service registry cannot be empty".to_string()));
        }
        for (service, urls) in registry {
            if urls.is_empty() {
                return Err(GatewayError::Validation(format!(
                    "service '{service}' has no instances"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_bind_address() {
        assert!(ConfigValidator::validate_bind_address("0.0.0.0:8000").is_ok());
    }

    #[test]
    fn invalid_bind_address() {
        assert!(ConfigValidator::validate_bind_address("").is_err());
        assert!(ConfigValidator::validate_bind_address("localhost").is_err());
    }

    #[test]
    fn valid_redis_url() {
        assert!(ConfigValidator::validate_redis_url("redis://localhost:6379").is_ok());
    }

    #[test]
    fn invalid_redis_url() {
        assert!(ConfigValidator::validate_redis_url("http://localhost:6379").is_err());
    }

    #[test]
    fn service_registry_rejects_empty_instance_list() {
        let mut registry = HashMap::new();
        registry.insert("light".to_string(), vec![]);
        assert!(ConfigValidator::validate_service_registry(&registry).is_err());
    }

    #[test]
    fn service_registry_accepts_populated_map() {
        let mut registry = HashMap::new();
        registry.insert("light".to_string(), vec!["http://u1".to_string()]);
        assert!(ConfigValidator::validate_service_registry(&registry).is_ok());
    }
}
