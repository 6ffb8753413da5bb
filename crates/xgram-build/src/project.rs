/// Project structure discovery
///
/// This module handles:
/// - Enforcing the `src/{commands,events,menus,services}` directory convention
/// - Enumerating the module sources of each category
/// - Deriving each module's logical name and display path

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};

/// Directory under the project root holding all module categories.
pub const SOURCE_DIR: &str = "src";

/// A convention-defined subdirectory grouping modules by runtime role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Commands,
    Events,
    Menus,
    Services,
}

impl Category {
    /// Every category, in the order the structure is checked.
    pub const ALL: [Category; 4] = [
        Category::Commands,
        Category::Events,
        Category::Menus,
        Category::Services,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Commands => "commands",
            Category::Events => "events",
            Category::Menus => "menus",
            Category::Services => "services",
        }
    }

    /// Prefix of positional artifact names, e.g. `command-0`.
    pub fn artifact_prefix(&self) -> &'static str {
        match self {
            Category::Commands => "command",
            Category::Events => "event",
            Category::Menus => "menu",
            Category::Services => "service",
        }
    }

    /// Whether module sources of this category are discovered yet.
    ///
    /// Events, menus and services only have their directory enforced.
    pub fn is_mapped(&self) -> bool {
        matches!(self, Category::Commands)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A discovered module source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Absolute path to the source file
    pub path: PathBuf,
    /// Path relative to the project root, always `/`-separated
    pub display_path: String,
    /// File name without its extension
    pub name: String,
}

/// A mapped project. Read-only once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Project {
    pub root: PathBuf,
    pub commands: Vec<ModuleDescriptor>,
    pub events: Vec<ModuleDescriptor>,
    pub menus: Vec<ModuleDescriptor>,
    pub services: Vec<ModuleDescriptor>,
}

impl Project {
    pub fn modules(&self, category: Category) -> &[ModuleDescriptor] {
        match category {
            Category::Commands => &self.commands,
            Category::Events => &self.events,
            Category::Menus => &self.menus,
            Category::Services => &self.services,
        }
    }

    /// Total number of discovered modules across all categories.
    pub fn module_count(&self) -> usize {
        Category::ALL.iter().map(|c| self.modules(*c).len()).sum()
    }
}

/// Maps a project root onto a [`Project`].
#[derive(Debug, Clone)]
pub struct StructureMapper {
    extensions: Vec<String>,
}

impl Default for StructureMapper {
    fn default() -> Self {
        Self::new(vec![".ts".to_string()])
    }
}

impl StructureMapper {
    /// Create a mapper recognizing the given file name suffixes.
    pub fn new(extensions: Vec<String>) -> Self {
        Self { extensions }
    }

    /// Map the project rooted at `root`.
    ///
    /// Fails on the first missing convention directory, checking `src`
    /// and then each category in [`Category::ALL`] order.
    pub fn map(&self, root: &Path) -> Result<Project> {
        let src_dir = root.join(SOURCE_DIR);
        if !src_dir.is_dir() {
            return Err(BuildError::StructurePathNotFound(format!("/{}", SOURCE_DIR)));
        }

        let mut project = Project {
            root: root.to_path_buf(),
            commands: Vec::new(),
            events: Vec::new(),
            menus: Vec::new(),
            services: Vec::new(),
        };

        for category in Category::ALL {
            let dir = src_dir.join(category.dir_name());
            if !dir.is_dir() {
                return Err(BuildError::StructurePathNotFound(format!(
                    "/{}/{}",
                    SOURCE_DIR,
                    category.dir_name()
                )));
            }

            if category.is_mapped() {
                let modules = self.map_category(category, &dir)?;
                match category {
                    Category::Commands => project.commands = modules,
                    Category::Events => project.events = modules,
                    Category::Menus => project.menus = modules,
                    Category::Services => project.services = modules,
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            commands = project.commands.len(),
            "mapped project structure"
        );

        Ok(project)
    }

    /// List the module sources directly inside one category directory.
    fn map_category(&self, category: Category, dir: &Path) -> Result<Vec<ModuleDescriptor>> {
        let mut file_names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            // Follows symlinks
            if !path.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(file_name) => file_names.push(file_name),
                Err(file_name) => {
                    tracing::warn!(
                        path = %path.display(),
                        name = ?file_name,
                        "skipping module with a non UTF-8 file name"
                    );
                }
            }
        }
        file_names.sort();

        let mut modules = Vec::new();
        let mut seen: HashMap<String, String> = HashMap::new();

        for file_name in file_names {
            let Some(name) = self.strip_extension(&file_name) else {
                continue;
            };

            let display_path = format!("{}/{}/{}", SOURCE_DIR, category.dir_name(), file_name);
            if let Some(first) = seen.get(name) {
                return Err(BuildError::DuplicateModule {
                    category: category.to_string(),
                    name: name.to_string(),
                    first: first.clone(),
                    second: display_path,
                });
            }
            seen.insert(name.to_string(), display_path.clone());

            modules.push(ModuleDescriptor {
                path: dir.join(&file_name),
                display_path,
                name: name.to_string(),
            });
        }

        Ok(modules)
    }

    /// Logical name of a file, if it carries a recognized suffix.
    fn strip_extension<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        self.extensions
            .iter()
            .filter_map(|ext| file_name.strip_suffix(ext.as_str()))
            .find(|name| !name.is_empty())
    }
}

/// Map a project with the default `.ts` module suffix.
pub fn map_project(root: &Path) -> Result<Project> {
    StructureMapper::default().map(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scaffold(dirs: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for dir in dirs {
            fs::create_dir_all(temp_dir.path().join(dir)).unwrap();
        }
        temp_dir
    }

    fn full_layout() -> TempDir {
        scaffold(&["src/commands", "src/events", "src/menus", "src/services"])
    }

    fn expect_missing(root: &Path, expected: &str) {
        match map_project(root) {
            Err(BuildError::StructurePathNotFound(path)) => assert_eq!(path, expected),
            other => panic!("Expected missing {}, got {:?}", expected, other),
        }
    }

    #[test]
    fn test_missing_src_dir() {
        let temp_dir = scaffold(&[]);
        expect_missing(temp_dir.path(), "/src");
    }

    #[test]
    fn test_src_as_file_is_not_a_directory() {
        let temp_dir = scaffold(&[]);
        fs::write(temp_dir.path().join("src"), "").unwrap();
        expect_missing(temp_dir.path(), "/src");
    }

    #[test]
    fn test_each_missing_category_is_named() {
        let all = ["src/commands", "src/events", "src/menus", "src/services"];
        for missing in all {
            let present: Vec<&str> = all.iter().copied().filter(|d| *d != missing).collect();
            let temp_dir = scaffold(&present);
            expect_missing(temp_dir.path(), &format!("/{}", missing));
        }
    }

    #[test]
    fn test_first_missing_path_wins() {
        let temp_dir = scaffold(&["src/events"]);
        expect_missing(temp_dir.path(), "/src/commands");
    }

    #[test]
    fn test_maps_command_files() {
        let temp_dir = full_layout();
        let commands = temp_dir.path().join("src/commands");
        fs::write(commands.join("ping.ts"), "export default () => {}").unwrap();
        fs::write(commands.join("greet.ts"), "export default () => {}").unwrap();
        fs::write(commands.join("README.md"), "# commands").unwrap();

        let project = map_project(temp_dir.path()).unwrap();

        assert_eq!(project.commands.len(), 2);
        assert_eq!(project.commands[0].name, "greet");
        assert_eq!(project.commands[0].display_path, "src/commands/greet.ts");
        assert_eq!(project.commands[0].path, commands.join("greet.ts"));
        assert_eq!(project.commands[1].name, "ping");
        assert_eq!(project.commands[1].display_path, "src/commands/ping.ts");
        assert!(project.events.is_empty());
        assert!(project.menus.is_empty());
        assert!(project.services.is_empty());
        assert_eq!(project.module_count(), 2);
    }

    #[test]
    fn test_does_not_recurse_into_subdirectories() {
        let temp_dir = full_layout();
        let nested = temp_dir.path().join("src/commands/admin");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("ban.ts"), "").unwrap();
        fs::create_dir_all(temp_dir.path().join("src/commands/folder.ts")).unwrap();

        let project = map_project(temp_dir.path()).unwrap();
        assert!(project.commands.is_empty());
    }

    #[test]
    fn test_other_categories_stay_empty() {
        let temp_dir = full_layout();
        fs::write(temp_dir.path().join("src/events/message.ts"), "").unwrap();

        let project = map_project(temp_dir.path()).unwrap();
        assert!(project.events.is_empty());
    }

    #[test]
    fn test_name_keeps_inner_dots() {
        let temp_dir = full_layout();
        fs::write(temp_dir.path().join("src/commands/user.info.ts"), "").unwrap();

        let project = map_project(temp_dir.path()).unwrap();
        assert_eq!(project.commands[0].name, "user.info");
    }

    #[test]
    fn test_duplicate_names_across_extensions() {
        let temp_dir = full_layout();
        fs::write(temp_dir.path().join("src/commands/greet.ts"), "").unwrap();
        fs::write(temp_dir.path().join("src/commands/greet.js"), "").unwrap();

        let mapper = StructureMapper::new(vec![".ts".to_string(), ".js".to_string()]);
        match mapper.map(temp_dir.path()) {
            Err(BuildError::DuplicateModule { name, first, second, .. }) => {
                assert_eq!(name, "greet");
                assert_eq!(first, "src/commands/greet.js");
                assert_eq!(second, "src/commands/greet.ts");
            }
            other => panic!("Expected duplicate module error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_module_is_mapped() {
        let temp_dir = full_layout();
        let shared = temp_dir.path().join("shared");
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("greet.ts"), "export default () => {}").unwrap();
        std::os::unix::fs::symlink(
            shared.join("greet.ts"),
            temp_dir.path().join("src/commands/greet.ts"),
        )
        .unwrap();
        std::os::unix::fs::symlink(&shared, temp_dir.path().join("src/commands/linked.ts")).unwrap();

        let project = map_project(temp_dir.path()).unwrap();
        let names: Vec<&str> = project.commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["greet"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = full_layout();
        let commands = temp_dir.path().join("src/commands");
        fs::write(commands.join(OsStr::from_bytes(b"bad\xff.ts")), "").unwrap();
        fs::write(commands.join("ping.ts"), "").unwrap();

        let project = map_project(temp_dir.path()).unwrap();
        let names: Vec<&str> = project.commands.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ping"]);
    }
}
