use std::collections::HashSet;

use crate::{config::models::KongConfig, core::resource::Resource};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid admin URL '{url}': {reason}")]
    InvalidAdminUrl { url: String, reason: String },

    #[error("Duplicate {kind} name '{name}' in {scope}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        scope: String,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Kong configuration validator
pub struct KongConfigValidator;

impl KongConfigValidator {
    /// Check only what the reconciler cannot run without: a usable admin URL.
    pub fn validate_admin_url(config: &KongConfig) -> ValidationResult<url::Url> {
        let raw = config
            .admin_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ValidationError::MissingField {
                field: "admin_url".to_string(),
            })?;

        let url = url::Url::parse(raw).map_err(|e| ValidationError::InvalidAdminUrl {
            url: raw.to_string(),
            reason: format!("Invalid URL format: {e}"),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::InvalidAdminUrl {
                url: raw.to_string(),
                reason: format!("URL scheme must be 'http' or 'https', got '{}'", url.scheme()),
            });
        }

        if url.host().is_none() {
            return Err(ValidationError::InvalidAdminUrl {
                url: raw.to_string(),
                reason: "URL must have a valid host".to_string(),
            });
        }

        Ok(url)
    }

    /// Validate the entire configuration, collecting every problem found.
    ///
    /// This is stricter than what reconciliation needs: unnamed entries, which
    /// the reconciler would skip at run time, are reported here.
    pub fn validate(config: &KongConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_admin_url(config) {
            errors.push(e);
        }

        let mut api_names = HashSet::new();
        for (i, api) in config.apis.iter().enumerate() {
            match api.name() {
                Some(name) => {
                    if !api_names.insert(name) {
                        errors.push(ValidationError::DuplicateName {
                            kind: "api",
                            name: name.to_string(),
                            scope: "apis".to_string(),
                        });
                    }
                }
                None => errors.push(ValidationError::InvalidField {
                    field: format!("apis[{i}].name"),
                    message: "Every API must have a non-empty name".to_string(),
                }),
            }

            if let Some(plugins) = &api.plugins {
                let scope = format!("api '{}'", api.name().unwrap_or("<unnamed>"));
                errors.extend(Self::validate_plugins(plugins, &format!("apis[{i}]"), &scope));
            }
        }

        errors.extend(Self::validate_plugins(
            &config.root_plugins,
            "root_plugins",
            "root scope",
        ));

        for (i, field) in config.masking_fields.iter().enumerate() {
            if field.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("masking_fields[{i}]"),
                    message: "Masking field names must not be empty".to_string(),
                });
            }
        }

        if config.client.request_timeout_secs == 0 {
            errors.push(ValidationError::InvalidField {
                field: "client.request_timeout_secs".to_string(),
                message: "Request timeout must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn validate_plugins(plugins: &[Resource], path: &str, scope: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        for (i, plugin) in plugins.iter().enumerate() {
            match plugin.name() {
                Some(name) => {
                    if !names.insert(name) {
                        errors.push(ValidationError::DuplicateName {
                            kind: "plugin",
                            name: name.to_string(),
                            scope: scope.to_string(),
                        });
                    }
                }
                None => errors.push(ValidationError::InvalidField {
                    field: format!("{path}.plugins[{i}].name"),
                    message: "Every plugin must have a non-empty name".to_string(),
                }),
            }
        }

        errors
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
