//! Persisted search-path configuration (spec §6 "Search-path options",
//! SPEC_FULL §12), field-for-field from `SearchPathOptions.h`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPathOptions {
    /// Path to the SDK which is being built against.
    pub sdk_path: Option<String>,
    /// Path(s) which should be searched for modules.
    pub import_search_paths: Vec<String>,
    /// Path(s) which should be searched for frameworks.
    pub framework_search_paths: Vec<String>,
    /// Path to search for compiler-relative header files.
    pub runtime_resource_path: Option<String>,
    /// Path to search for compiler-relative stdlib dylibs.
    pub runtime_library_path: Option<String>,
    /// Path to search for compiler-relative stdlib modules.
    pub runtime_library_import_path: Option<String>,
}

impl SearchPathOptions {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let opts = SearchPathOptions {
            sdk_path: Some("/sdk".to_string()),
            import_search_paths: vec!["/mods".to_string()],
            framework_search_paths: vec![],
            runtime_resource_path: None,
            runtime_library_path: None,
            runtime_library_import_path: None,
        };
        let json = opts.to_json().unwrap();
        let back = SearchPathOptions::from_json(&json).unwrap();
        assert_eq!(back.sdk_path, opts.sdk_path);
        assert_eq!(back.import_search_paths, opts.import_search_paths);
    }
}
