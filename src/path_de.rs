use serde::de::DeserializeOwned;
use thiserror::Error;

/// Deserialization failure located by JSON path.
#[derive(Debug, Error)]
#[error("at JSON path {path} → {source}")]
pub struct PathError {
    pub path: String,
    #[source]
    pub source: serde_json::Error,
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| PathError {
        path: err.path().to_string(),
        source: err.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, serde::Deserialize)]
    struct Cfg {
        discriminators: HashMap<String, String>,
    }

    #[test]
    fn error_names_the_offending_path() {
        let err = from_str_with_path::<Cfg>(r#"{ "discriminators": { "Provider": 3 } }"#).unwrap_err();
        assert_eq!(err.path, "discriminators.Provider");
        assert!(err.to_string().starts_with("at JSON path discriminators.Provider"));
    }

    #[test]
    fn valid_input_deserializes() {
        let cfg: Cfg = from_str_with_path(r#"{ "discriminators": { "Provider": "vendor" } }"#).unwrap();
        assert_eq!(cfg.discriminators["Provider"], "vendor");
    }
}
