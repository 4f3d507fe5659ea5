//! The `meta.json` document served to the UI.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entry::Catalog;

/// Top-level `meta.json` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaJson {
    pub about: About,
    pub stories: BTreeMap<String, MetaStory>,
}

/// Tool information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct About {
    pub name: String,
    pub version: String,
}

impl Default for About {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One story as exposed in `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaStory {
    pub name: String,
    pub title: String,
    pub levels: Vec<String>,
    pub file_path: String,
    pub loc_start: u32,
    pub loc_end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl From<&Catalog> for MetaJson {
    fn from(catalog: &Catalog) -> Self {
        let stories = catalog
            .stories()
            .map(|entry| {
                (
                    entry.id.clone(),
                    MetaStory {
                        name: entry.name.clone(),
                        title: entry.title.clone(),
                        levels: entry.levels.clone(),
                        file_path: entry.file_path.clone(),
                        loc_start: entry.loc_start,
                        loc_end: entry.loc_end,
                        meta: entry.meta.clone(),
                    },
                )
            })
            .collect();

        Self {
            about: About::default(),
            stories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entry::test_entry;

    #[test]
    fn test_meta_json_shape() {
        let mut catalog = Catalog::new();
        let mut entry = test_entry("button--primary", "src/button.stories.tsx", 4);
        entry.meta = Some(serde_json::json!({ "width": 300 }));
        catalog.insert_file("src/button.stories.tsx", vec![entry]);

        let value = serde_json::to_value(MetaJson::from(&catalog)).unwrap();
        let story = &value["stories"]["button--primary"];

        assert_eq!(story["filePath"], "src/button.stories.tsx");
        assert_eq!(story["locStart"], 4);
        assert_eq!(story["locEnd"], 6);
        assert_eq!(story["meta"]["width"], 300);
        assert_eq!(value["about"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_meta_omitted_when_absent() {
        let mut catalog = Catalog::new();
        catalog.insert_file("a.js", vec![test_entry("a--default", "a.js", 1)]);

        let value = serde_json::to_value(MetaJson::from(&catalog)).unwrap();
        assert!(value["stories"]["a--default"].get("meta").is_none());
    }
}
