//! Provider credentials, read from the process environment.

const EDAMAM_APP_ID: &str = "EDAMAM_APP_ID";
const EDAMAM_APP_KEY: &str = "EDAMAM_APP_KEY";
const SPOONACULAR_API_KEY: &str = "SPOONACULAR_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdamamCredentials {
    pub app_id: String,
    pub app_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Both halves of the pair must be present.
    pub edamam: Option<EdamamCredentials>,
    pub spoonacular_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let edamam = match (get(EDAMAM_APP_ID), get(EDAMAM_APP_KEY)) {
            (Some(app_id), Some(app_key)) => Some(EdamamCredentials { app_id, app_key }),
            _ => None,
        };

        Config {
            edamam,
            spoonacular_key: get(SPOONACULAR_API_KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn all_present() {
        let c = config(&[
            ("EDAMAM_APP_ID", "id"),
            ("EDAMAM_APP_KEY", "key"),
            ("SPOONACULAR_API_KEY", "spoon"),
        ]);
        assert_eq!(
            c.edamam,
            Some(EdamamCredentials { app_id: "id".into(), app_key: "key".into() })
        );
        assert_eq!(c.spoonacular_key.as_deref(), Some("spoon"));
    }

    #[test]
    fn half_a_pair_disables_edamam() {
        let c = config(&[("EDAMAM_APP_ID", "id")]);
        assert!(c.edamam.is_none());
        assert!(c.spoonacular_key.is_none());
    }

    #[test]
    fn blank_counts_as_unset() {
        let c = config(&[("SPOONACULAR_API_KEY", "  ")]);
        assert!(c.spoonacular_key.is_none());
    }
}
