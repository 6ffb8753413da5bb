//! Compiled per-module outputs and the inputs that produce them.

use std::path::{Path, PathBuf};

use crate::project::{Category, ModuleDescriptor, Project};

/// One named input handed to the bundler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInput {
    /// Positional output name, e.g. `command-0`
    pub id: String,
    pub category: Category,
    pub module: ModuleDescriptor,
}

impl BundleInput {
    /// One input per discovered module, named positionally within its category.
    pub fn for_project(project: &Project) -> Vec<BundleInput> {
        Category::ALL
            .iter()
            .flat_map(|category| {
                project
                    .modules(*category)
                    .iter()
                    .enumerate()
                    .map(move |(index, module)| BundleInput {
                        id: format!("{}-{}", category.artifact_prefix(), index),
                        category: *category,
                        module: module.clone(),
                    })
            })
            .collect()
    }
}

/// A compiled output file for one input module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: String,
    pub category: Category,
    /// Logical module name
    pub name: String,
    /// Source path relative to the project root
    pub display_path: String,
    /// Compiled output on disk
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(input: &BundleInput, path: impl Into<PathBuf>) -> Self {
        Self {
            id: input.id.clone(),
            category: input.category,
            name: input.module.name.clone(),
            display_path: input.module.display_path.clone(),
            path: path.into(),
        }
    }
}

/// Compiled outputs in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactMap {
    artifacts: Vec<Artifact>,
}

impl ArtifactMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Look up an artifact by its positional id.
    pub fn get(&self, id: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    /// Look up an artifact by category and logical module name.
    pub fn by_name(&self, category: Category, name: &str) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|a| a.category == category && a.name == name)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(move |a| a.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.artifacts.iter().map(|a| a.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl FromIterator<Artifact> for ArtifactMap {
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        Self {
            artifacts: iter.into_iter().collect(),
        }
    }
}
