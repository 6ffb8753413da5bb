/// Entry-point synthesis
///
/// Renders the merged runtime entry: one import per compiled command
/// artifact plus a `declareCommands()` function returning every collected
/// declaration, spliced into the bootstrap skeleton at its marker.

use std::fmt::Write as _;
use std::path::{Component, Path};

use crate::artifact::ArtifactMap;
use crate::declaration::CommandDeclaration;
use crate::error::{BuildError, Result};

/// Marker line in the skeleton replaced by the generated code.
pub const INJECTION_MARKER: &str = "/// @inject-here";

/// Bootstrap skeleton the generated code is injected into.
pub const SKELETON: &str = include_str!("../skeleton/virtual-index.ts");

/// One default-import binding: `import <ident> from "<specifier>";`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub ident: String,
    pub specifier: String,
    pub export: String,
}

/// One element of the returned declaration array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationRecord {
    pub ident: String,
    pub trigger: String,
    pub prefix: String,
}

/// The generated part of the entry module.
#[derive(Debug, Clone, Default)]
pub struct EntryModule {
    imports: Vec<ImportBinding>,
    records: Vec<DeclarationRecord>,
}

impl EntryModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command, binding its handler to the next positional identifier.
    pub fn add_command(
        &mut self,
        specifier: impl Into<String>,
        declaration: &CommandDeclaration,
    ) -> &str {
        let ident = format!("command{}", self.imports.len());
        self.imports.push(ImportBinding {
            ident: ident.clone(),
            specifier: specifier.into(),
            export: declaration.handler.export.clone(),
        });
        self.records.push(DeclarationRecord {
            ident,
            trigger: declaration.trigger.clone(),
            prefix: declaration.prefix.clone(),
        });
        &self.imports[self.imports.len() - 1].ident
    }

    pub fn imports(&self) -> &[ImportBinding] {
        &self.imports
    }

    pub fn records(&self) -> &[DeclarationRecord] {
        &self.records
    }

    /// Render the imports and the declaration function.
    pub fn render(&self) -> Result<String> {
        let mut output = String::new();

        for import in &self.imports {
            if import.export == "default" {
                writeln!(
                    output,
                    "import {} from \"{}\";",
                    import.ident,
                    escape_string(&import.specifier)
                )?;
            } else {
                writeln!(
                    output,
                    "import {{ {} as {} }} from \"{}\";",
                    export_name(&import.export),
                    import.ident,
                    escape_string(&import.specifier)
                )?;
            }
        }
        if !self.imports.is_empty() {
            output.push('\n');
        }

        output.push_str("function declareCommands(): CommandDeclaration[] {\n");
        if self.records.is_empty() {
            output.push_str("    return [];\n");
        } else {
            output.push_str("    return [\n");
            for record in &self.records {
                writeln!(
                    output,
                    "        {{ trigger: \"{}\", prefix: \"{}\", handler: {} }},",
                    escape_string(&record.trigger),
                    escape_string(&record.prefix),
                    record.ident
                )?;
            }
            output.push_str("    ];\n");
        }
        output.push_str("}\n");

        Ok(output)
    }
}

/// Synthesize the full entry source.
///
/// Import specifiers are relative to `entry_dir`, the directory the entry
/// source will be written to. Every declaration's handler artifact must be
/// present in `artifacts`.
pub fn synthesize(
    skeleton: &str,
    entry_dir: &Path,
    artifacts: &ArtifactMap,
    declarations: &[CommandDeclaration],
) -> Result<String> {
    let mut module = EntryModule::new();
    for declaration in declarations {
        let artifact = artifacts.get(&declaration.handler.artifact).ok_or_else(|| {
            BuildError::codegen(format!(
                "No compiled artifact '{}' for command '{}'",
                declaration.handler.artifact, declaration.trigger
            ))
        })?;
        let specifier = relative_specifier(entry_dir, &artifact.path)?;
        module.add_command(specifier, declaration);
    }

    inject(skeleton, &module.render()?)
}

/// Replace the single marker in `skeleton` with `generated`.
pub fn inject(skeleton: &str, generated: &str) -> Result<String> {
    match skeleton.matches(INJECTION_MARKER).count() {
        1 => Ok(skeleton.replacen(INJECTION_MARKER, generated.trim_end(), 1)),
        0 => Err(BuildError::codegen(format!(
            "Skeleton does not contain the marker {}",
            INJECTION_MARKER
        ))),
        n => Err(BuildError::codegen(format!(
            "Skeleton contains the marker {} {} times",
            INJECTION_MARKER, n
        ))),
    }
}

/// `./`-prefixed, `/`-separated path from `from_dir` down to `target`.
fn relative_specifier(from_dir: &Path, target: &Path) -> Result<String> {
    let relative = target.strip_prefix(from_dir).map_err(|_| {
        BuildError::codegen(format!(
            "Artifact {} is outside {}",
            target.display(),
            from_dir.display()
        ))
    })?;

    let mut specifier = String::from(".");
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                specifier.push('/');
                specifier.push_str(&part.to_string_lossy());
            }
            _ => {
                return Err(BuildError::codegen(format!(
                    "Unsupported artifact path {}",
                    target.display()
                )));
            }
        }
    }
    Ok(specifier)
}

/// Export names that are not identifiers must be quoted in import clauses.
fn export_name(name: &str) -> String {
    let mut chars = name.chars();
    let is_identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        name.to_string()
    } else {
        format!("\"{}\"", escape_string(name))
    }
}

/// Escape a string for a double-quoted JavaScript string literal
fn escape_string(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            c if c.is_control() => {
                let _ = write!(escaped, "\\u{:04x}", c as u32);
            }
            c => escaped.push(c),
        }
    }
    escaped
}
