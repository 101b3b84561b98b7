//! Service configuration.

use serde::{Deserialize, Serialize};

/// Settings shared by every collection handle of a service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Name of the identifier field in stored records.
    pub id_field: String,
    /// Upper bound on in-flight backend calls for per-record batch paths.
    pub max_concurrency: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id_field: "_id".to_string(),
            max_concurrency: 8,
        }
    }
}

impl ServiceConfig {
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_settings_take_defaults() {
        let config: ServiceConfig = serde_json::from_value(json!({ "id_field": "key" })).unwrap();
        assert_eq!(config.id_field, "key");
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn concurrency_is_at_least_one() {
        assert_eq!(ServiceConfig::default().with_max_concurrency(0).max_concurrency, 1);
    }
}
