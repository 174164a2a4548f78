// ── Configuration keys ───────────────────────────────────────────────────────

const FIRESTORE_KEYS: &[&str] = &[
    "FIREBASE_PROJECT_ID",
    "FIREBASE_PRIVATE_KEY_ID",
    "FIREBASE_PRIVATE_KEY",
    "FIREBASE_CLIENT_EMAIL",
];

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PORT: u16 = 8000;

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY environment variable is not set")]
    MissingApiKey,
    #[error("Firestore is enabled but credential fields are missing: {0}")]
    MissingFirestoreFields(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

// ── Config types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub port: u16,
    pub firestore: Option<FirestoreConfig>,
}

/// Service-account credential fields for the document store. Present only
/// when storage is enabled.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as
    /// absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;
        let gemini_model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue("PORT", raw))?,
            None => DEFAULT_PORT,
        };

        // Storage is enabled by the presence of any credential field; a
        // partial credential set is a fatal startup error that names every
        // missing field.
        let provided: Vec<&str> = FIRESTORE_KEYS
            .iter()
            .copied()
            .filter(|key| get(key).is_some())
            .collect();

        let firestore = if provided.is_empty() {
            None
        } else {
            match (
                get("FIREBASE_PROJECT_ID"),
                get("FIREBASE_PRIVATE_KEY_ID"),
                get("FIREBASE_PRIVATE_KEY"),
                get("FIREBASE_CLIENT_EMAIL"),
            ) {
                (Some(project_id), Some(private_key_id), Some(private_key), Some(client_email)) => {
                    Some(FirestoreConfig {
                        project_id,
                        private_key_id,
                        private_key,
                        client_email,
                    })
                }
                _ => {
                    let missing: Vec<&str> = FIRESTORE_KEYS
                        .iter()
                        .copied()
                        .filter(|key| get(key).is_none())
                        .collect();
                    return Err(ConfigError::MissingFirestoreFields(missing.join(", ")));
                }
            }
        };

        Ok(Self {
            gemini_api_key,
            gemini_model,
            port,
            firestore,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.port, 8000);
        assert!(config.firestore.is_none());
    }

    #[test]
    fn overrides_are_honored() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-2.5-pro"),
            ("PORT", "9001"),
        ]))
        .unwrap();
        assert_eq!(config.gemini_model, "gemini-2.5-pro");
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn invalid_port_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "k"), ("PORT", "nope")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("PORT", _)));
    }

    #[test]
    fn partial_firestore_credentials_enumerate_missing_fields() {
        let err = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("FIREBASE_PROJECT_ID", "proj"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::MissingFirestoreFields(fields) => {
                assert!(fields.contains("FIREBASE_PRIVATE_KEY_ID"));
                assert!(fields.contains("FIREBASE_PRIVATE_KEY"));
                assert!(fields.contains("FIREBASE_CLIENT_EMAIL"));
                assert!(!fields.contains("FIREBASE_PROJECT_ID"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn complete_firestore_credentials_enable_storage() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "k"),
            ("FIREBASE_PROJECT_ID", "proj"),
            ("FIREBASE_PRIVATE_KEY_ID", "kid"),
            ("FIREBASE_PRIVATE_KEY", "pem"),
            ("FIREBASE_CLIENT_EMAIL", "svc@proj.iam.gserviceaccount.com"),
        ]))
        .unwrap();
        let firestore = config.firestore.unwrap();
        assert_eq!(firestore.project_id, "proj");
        assert_eq!(firestore.client_email, "svc@proj.iam.gserviceaccount.com");
    }

    #[test]
    fn blank_values_count_as_absent() {
        let err =
            AppConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }
}
