//! Cached modules served by the dev server.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::catalog::Catalog;

/// Module id to generated source.
///
/// Every invalidation bumps a generation counter, so a render started before
/// an invalidation can be refused instead of cached.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: RwLock<Modules>,
}

#[derive(Debug, Default)]
struct Modules {
    sources: HashMap<String, Arc<str>>,
    generation: u64,
}

impl ModuleGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached source for a module.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<str>> {
        self.modules.read().sources.get(id).cloned()
    }

    /// Current generation. Read it before rendering a module and pass it to
    /// [`ModuleGraph::insert_if_generation`].
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.modules.read().generation
    }

    /// Cache a module's source, returning the shared handle.
    pub fn insert(&self, id: impl Into<String>, source: impl Into<Arc<str>>) -> Arc<str> {
        let source = source.into();
        self.modules
            .write()
            .sources
            .insert(id.into(), Arc::clone(&source));
        source
    }

    /// Cache a module's source only if nothing was invalidated since
    /// `generation` was read.
    ///
    /// Returns `None` when the render is outdated and was not cached.
    pub fn insert_if_generation(
        &self,
        id: impl Into<String>,
        generation: u64,
        source: impl Into<Arc<str>>,
    ) -> Option<Arc<str>> {
        let mut modules = self.modules.write();
        if modules.generation != generation {
            return None;
        }
        let source = source.into();
        modules.sources.insert(id.into(), Arc::clone(&source));
        Some(source)
    }

    /// Drop a module. Returns whether it was loaded.
    pub fn invalidate(&self, id: &str) -> bool {
        let mut modules = self.modules.write();
        modules.generation += 1;
        modules.sources.remove(id).is_some()
    }

    /// Whether a module is cached.
    #[must_use]
    pub fn is_loaded(&self, id: &str) -> bool {
        self.modules.read().sources.contains_key(id)
    }

    /// Number of cached modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.read().sources.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.read().sources.is_empty()
    }
}

/// Render the story list module for a catalog.
///
/// Each story file is imported once as a namespace and every story points
/// at its export.
#[must_use]
pub fn render_story_list(catalog: &Catalog) -> String {
    let mut out = String::new();

    for (idx, file_path) in catalog.files().keys().enumerate() {
        let _ = writeln!(out, "import * as $s{idx} from {};", quote(&format!("/{file_path}")));
    }

    out.push_str("\nexport const stories = {\n");
    for (idx, entries) in catalog.files().values().enumerate() {
        for entry in entries {
            let _ = writeln!(
                out,
                "  {}: {{ name: {}, levels: {}, filePath: {}, component: $s{idx}[{}] }},",
                quote(&entry.id),
                quote(&entry.name),
                serde_json::to_string(&entry.levels).unwrap_or_else(|_| "[]".to_string()),
                quote(&entry.file_path),
                quote(&entry.export_name),
            );
        }
    }
    out.push_str("};\n\nexport default stories;\n");

    out
}

fn quote(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}
