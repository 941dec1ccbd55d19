use serde::{Serialize, de::DeserializeOwned};

/// A typed view over a JSON text column.
///
/// Reads never fail: a missing or malformed value yields `Default::default()`,
/// so older rows with partial payloads still load.
pub trait JsonBlob: Serialize + DeserializeOwned + Default {
    fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_default()
    }

    fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl<T: Serialize + DeserializeOwned> JsonBlob for Vec<T> {}
