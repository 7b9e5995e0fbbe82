//! Tool catalog: named [`ToolDefinition`]s loaded from TOML.
//!
//! ```toml
//! [tools.httpx]
//! description = "HTTP probing"
//! mode = "multiple"
//! command = "httpx -l {input} {args} {auto_optimizations}"
//! auto_optimizations = ["-threads 50"]
//! ```
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use bulker_model::{InputKind, TemplateError, ToolDefinition};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

mod builtin;

/// File name looked up in the working directory and the home directory.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
    #[error("tool {0} not found in config")]
    UnknownTool(String),
    #[error("tool {tool}: {source}")]
    InvalidTool {
        tool: String,
        #[source]
        source: TemplateError,
    },
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    tools: BTreeMap<String, ToolDefinition>,
}

/// Case-insensitive map of tool name to definition.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDefinition>,
    source: Option<PathBuf>,
}

impl ToolCatalog {
    /// Only the built-in tools.
    pub fn builtin() -> Self {
        let mut catalog = Self {
            tools: BTreeMap::new(),
            source: None,
        };
        for def in builtin::tools() {
            catalog.insert(def);
        }
        catalog
    }

    /// Built-ins plus every `[tools.<name>]` table of `text`; file entries win.
    pub fn from_toml_str(text: &str, source: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text).map_err(|e| CatalogError::Parse {
            path: source.to_path_buf(),
            source: Box::new(e),
        })?;

        let mut catalog = Self::builtin();
        catalog.source = Some(source.to_path_buf());
        for (name, mut def) in file.tools {
            def.name = name.to_ascii_lowercase();
            validate(&def)?;
            catalog.insert(def);
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogError::NotFound(path.to_path_buf())
            } else {
                CatalogError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let catalog = Self::from_toml_str(&text, path)?;
        debug!(path = %path.display(), tools = catalog.tools.len(), "tool catalog loaded");
        Ok(catalog)
    }

    /// An explicit path must exist. Otherwise the first existing file among
    /// [`ToolCatalog::search_paths`] is loaded, falling back to the built-ins.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, CatalogError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load(&path),
            None => {
                debug!("no config file found; using built-in tools only");
                Ok(Self::builtin())
            }
        }
    }

    /// `./config.toml`, `~/.config/bulker/config.toml`, `~/config.toml`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("bulker").join(CONFIG_FILE));
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("bulker").join(CONFIG_FILE);
            if !paths.contains(&xdg) {
                paths.push(xdg);
            }
            paths.push(home.join(CONFIG_FILE));
        }
        paths
    }

    fn insert(&mut self, def: ToolDefinition) {
        self.tools.insert(def.name.to_ascii_lowercase(), def);
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition, CatalogError> {
        self.tools
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| CatalogError::UnknownTool(name.to_string()))
    }

    /// Definitions sorted by name.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Argv for one invocation of `name`.
    pub fn expand_command(
        &self,
        name: &str,
        input: &str,
        args: &[String],
        output: Option<&str>,
        wordlist: Option<&str>,
    ) -> Result<Vec<String>, CatalogError> {
        let def = self.lookup(name)?;
        def.expand_command(input, args, output, wordlist)
            .map_err(|source| CatalogError::InvalidTool {
                tool: def.name.clone(),
                source,
            })
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn validate(def: &ToolDefinition) -> Result<(), CatalogError> {
    let invalid = |source| CatalogError::InvalidTool {
        tool: def.name.clone(),
        source,
    };
    if def.command.trim().is_empty() {
        return Err(invalid(TemplateError::Empty));
    }
    if shlex::split(&def.command).is_none() {
        return Err(invalid(TemplateError::Unbalanced(def.command.clone())));
    }
    if def.input == InputKind::Inline && !def.uses_stdout {
        debug!(tool = %def.name, "inline tool declares file output; output file is ignored");
    }
    Ok(())
}
