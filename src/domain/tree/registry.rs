//! Frozen lookup of trees by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::definition::TreeDefinition;
use super::errors::ConfigurationError;

/// Registration phase. Append-only; duplicate names are rejected.
#[derive(Debug, Default)]
pub struct TreeRegistryBuilder {
    trees: HashMap<String, Arc<TreeDefinition>>,
}

impl TreeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tree.
    ///
    /// # Errors
    ///
    /// - `DuplicateTree` if a tree with the same name is already registered
    pub fn register(&mut self, tree: TreeDefinition) -> Result<(), ConfigurationError> {
        if self.trees.contains_key(tree.name()) {
            return Err(ConfigurationError::DuplicateTree(tree.name().to_string()));
        }
        self.trees.insert(tree.name().to_string(), Arc::new(tree));
        Ok(())
    }

    /// Registers every tree, stopping at the first duplicate.
    pub fn register_all(
        &mut self,
        trees: impl IntoIterator<Item = TreeDefinition>,
    ) -> Result<(), ConfigurationError> {
        trees.into_iter().try_for_each(|tree| self.register(tree))
    }

    pub fn build(self) -> TreeRegistry {
        TreeRegistry {
            trees: Arc::new(self.trees),
        }
    }
}

/// Read-only tree lookup shared by every request.
#[derive(Debug, Clone, Default)]
pub struct TreeRegistry {
    trees: Arc<HashMap<String, Arc<TreeDefinition>>>,
}

impl TreeRegistry {
    pub fn builder() -> TreeRegistryBuilder {
        TreeRegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<Arc<TreeDefinition>> {
        self.trees.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    /// Registered tree names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.trees.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
