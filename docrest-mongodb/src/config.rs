//! Connection settings for the MongoDB backend.

use serde::Deserialize;

use docrest_core::error::{RecordError, RecordResult};

const DEFAULT_DSN: &str = "mongodb://localhost:27017";
const SCHEME: &str = "mongodb://";

/// Connection block as found in service configuration files.
///
/// ```ignore
/// let config: MongoDbConfig = serde_json::from_value(json!({
///     "dsn": "db.internal:27017/shop",
///     "user": "api",
///     "pwd": "secret",
/// }))?;
/// let store = MongoDbStoreBuilder::from_config(config)?.build().await?;
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MongoDbConfig {
    pub dsn: String,
    pub db: Option<String>,
    pub user: Option<String>,
    pub pwd: Option<String>,
    /// Field records are keyed by, `_id` when unset.
    pub id_field: Option<String>,
}

impl MongoDbConfig {
    /// The connection string, defaulted and prefixed with the `mongodb://` scheme.
    pub fn connection_string(&self) -> String {
        let dsn = self.dsn.trim();

        if dsn.is_empty() {
            DEFAULT_DSN.to_string()
        } else if dsn.contains("://") {
            dsn.to_string()
        } else {
            format!("{SCHEME}{dsn}")
        }
    }

    /// The configured database, falling back to the path of the connection string.
    pub fn database(&self) -> RecordResult<String> {
        self.db
            .as_deref()
            .map(str::trim)
            .filter(|db| !db.is_empty())
            .map(str::to_string)
            .or_else(|| database_from_dsn(&self.connection_string()))
            .ok_or_else(|| {
                RecordError::Initialization(
                    "no database given in the configuration or the connection string".into(),
                )
            })
    }

    /// The id field, defaulting to `_id`.
    pub fn id_field(&self) -> String {
        self.id_field
            .as_deref()
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .unwrap_or("_id")
            .to_string()
    }

    /// Username and password, when both are set.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.user, &self.pwd) {
            (Some(user), Some(pwd)) if !user.is_empty() => Some((user.clone(), pwd.clone())),
            _ => None,
        }
    }
}

fn database_from_dsn(dsn: &str) -> Option<String> {
    let (_, rest) = dsn.split_once("://")?;
    let (_, path) = rest.split_once('/')?;
    let name = path.split(['?', '/']).next()?;

    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dsn: &str, db: Option<&str>) -> MongoDbConfig {
        MongoDbConfig {
            dsn: dsn.into(),
            db: db.map(Into::into),
            ..MongoDbConfig::default()
        }
    }

    #[test]
    fn connection_string_defaults() {
        assert_eq!(config("", None).connection_string(), "mongodb://localhost:27017");
        assert_eq!(config("db:27017", None).connection_string(), "mongodb://db:27017");
        assert_eq!(
            config("mongodb+srv://cluster.example.net", None).connection_string(),
            "mongodb+srv://cluster.example.net"
        );
    }

    #[test]
    fn database_resolution() {
        assert_eq!(config("db:27017", Some("shop")).database().unwrap(), "shop");
        assert_eq!(config("db:27017/shop?w=1", None).database().unwrap(), "shop");
        assert!(matches!(
            config("db:27017", None).database(),
            Err(RecordError::Initialization(_))
        ));
    }

    #[test]
    fn credentials_need_a_user() {
        let mut settings = config("", Some("shop"));
        assert_eq!(settings.credentials(), None);

        settings.user = Some("api".into());
        settings.pwd = Some("secret".into());
        assert_eq!(settings.credentials(), Some(("api".into(), "secret".into())));
    }

    #[test]
    fn id_field_defaults_to_object_id() {
        let mut settings = config("", Some("shop"));
        assert_eq!(settings.id_field(), "_id");

        settings.id_field = Some("key".into());
        assert_eq!(settings.id_field(), "key");
    }
}
