use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ModelError, TemplateError, TemplateVars, expand_template, merge_auto_tuning};

/// How the input is partitioned into tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolMode {
    /// One invocation per input line.
    Single,
    /// One invocation per contiguous chunk of lines, sized by the worker count.
    #[default]
    Multiple,
}

impl FromStr for ToolMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(ToolMode::Single),
            "multiple" => Ok(ToolMode::Multiple),
            _ => Err(ModelError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolMode::Single => f.write_str("single"),
            ToolMode::Multiple => f.write_str("multiple"),
        }
    }
}

/// How a task hands its lines to the tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Lines are written to a chunk file whose path replaces `{input}`.
    #[default]
    File,
    /// Lines are joined with `\n` and substituted for `{input}` directly.
    Inline,
}

/// Immutable description of one wrapped tool, as loaded from the catalog.
///
/// ```toml
/// [tools.arjun]
/// description = "HTTP parameter discovery"
/// mode = "multiple"
/// command = "arjun -i {input} {args} {auto_optimizations}"
/// uses_stdout = false
/// output_flags = ["-oT", "-oJ", "-o"]
/// auto_optimizations = ["-t 10", "-d 0", "--rate-limit 50", "-T 5"]
/// flag_aliases = { "-t" = ["--threads"], "-d" = ["--delay"], "-T" = ["--timeout"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Catalog key; filled in by the loader.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mode: ToolMode,
    /// Command template, e.g. `httpx -l {input} {args}`.
    pub command: String,
    /// First line the tool writes to its own output; kept once in the consolidated file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// `false` for tools whose real results go to a file they manage themselves.
    #[serde(default = "default_true")]
    pub uses_stdout: bool,
    #[serde(default)]
    pub input: InputKind,
    /// Auto-tuning entries (`"-t 10"`), applied only when the user did not set the flag.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub auto_optimizations: Vec<String>,
    /// Alternative spellings of auto-tuned flags (`"-t" = ["--threads"]`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flag_aliases: BTreeMap<String, Vec<String>>,
    /// Flags that take an output path. The first one is used when the user gave none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

fn default_true() -> bool {
    true
}

const DEFAULT_OUTPUT_FLAGS: &[&str] = &["-o"];

impl ToolDefinition {
    /// Minimal definition: multiple mode, file input, stdout output.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            mode: ToolMode::default(),
            command: command.into(),
            header: None,
            uses_stdout: true,
            input: InputKind::default(),
            auto_optimizations: Vec::new(),
            flag_aliases: BTreeMap::new(),
            output_flags: Vec::new(),
            examples: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: ToolMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_input(mut self, input: InputKind) -> Self {
        self.input = input;
        self
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Marks the tool as writing its results to a file it manages itself.
    pub fn with_file_output(mut self, flags: &[&str]) -> Self {
        self.uses_stdout = false;
        self.output_flags = flags.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_auto_optimizations(mut self, entries: &[&str]) -> Self {
        self.auto_optimizations = entries.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_alias(mut self, flag: &str, aliases: &[&str]) -> Self {
        self.flag_aliases.insert(
            flag.to_string(),
            aliases.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    /// Declared header, with an empty string treated as "no header".
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref().filter(|h| !h.trim().is_empty())
    }

    pub fn needs_wordlist(&self) -> bool {
        self.command.contains("{wordlist}")
    }

    pub fn template_has(&self, placeholder: &str) -> bool {
        self.command.contains(placeholder)
    }

    /// Output flags this tool recognises; `-o` when none are declared.
    pub fn output_flags(&self) -> Vec<&str> {
        if self.output_flags.is_empty() {
            DEFAULT_OUTPUT_FLAGS.to_vec()
        } else {
            self.output_flags.iter().map(String::as_str).collect()
        }
    }

    /// Expands the command template for one invocation.
    ///
    /// `args` must already have their output flags handled by the caller; the
    /// auto-tuning defaults are merged here, skipping every flag present in `args`.
    pub fn expand_command(
        &self,
        input: &str,
        args: &[String],
        output: Option<&str>,
        wordlist: Option<&str>,
    ) -> Result<Vec<String>, TemplateError> {
        if self.needs_wordlist() && wordlist.is_none() {
            return Err(TemplateError::MissingWordlist);
        }
        let auto = merge_auto_tuning(&self.auto_optimizations, &self.flag_aliases, args)?;
        expand_template(
            &self.command,
            &TemplateVars {
                input,
                args,
                auto_optimizations: &auto,
                output,
                wordlist,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_catalog_entry_with_defaults() {
        let def: ToolDefinition = toml::from_str(
            r#"
            description = "probe"
            command = "httpx -l {input} {args}"
            "#,
        )
        .unwrap();

        assert_eq!(def.mode, ToolMode::Multiple);
        assert_eq!(def.input, InputKind::File);
        assert!(def.uses_stdout);
        assert!(def.header().is_none());
        assert_eq!(def.output_flags(), vec!["-o"]);
    }

    #[test]
    fn deserializes_file_output_tool() {
        let def: ToolDefinition = toml::from_str(
            r#"
            mode = "single"
            command = "arjun -u {input} {args} {auto_optimizations}"
            header = "url,params"
            uses_stdout = false
            output_flags = ["-oT", "-oJ"]
            auto_optimizations = ["-t 10", "-T 5"]
            flag_aliases = { "-t" = ["--threads"] }
            "#,
        )
        .unwrap();

        assert_eq!(def.mode, ToolMode::Single);
        assert!(!def.uses_stdout);
        assert_eq!(def.header(), Some("url,params"));
        assert_eq!(def.output_flags(), vec!["-oT", "-oJ"]);
        assert_eq!(def.flag_aliases["-t"], vec!["--threads".to_string()]);
    }

    #[test]
    fn empty_header_means_none() {
        let def = ToolDefinition::new("x", "x {input}").with_header("  ");
        assert!(def.header().is_none());
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Single".parse::<ToolMode>().unwrap(), ToolMode::Single);
        assert!("batch".parse::<ToolMode>().is_err());
    }

    #[test]
    fn expand_requires_wordlist_when_template_uses_it() {
        let def = ToolDefinition::new("ffuf", "ffuf -u {input} -w {wordlist}");
        assert_eq!(
            def.expand_command("a", &[], None, None),
            Err(TemplateError::MissingWordlist)
        );

        let argv = def.expand_command("a", &[], None, Some("words.txt")).unwrap();
        assert_eq!(argv, ["ffuf", "-u", "a", "-w", "words.txt"]);
    }

    #[test]
    fn expand_applies_auto_tuning_unless_user_overrides() {
        let def = ToolDefinition::new("arjun", "arjun -i {input} {args} {auto_optimizations}")
            .with_auto_optimizations(&["-t 10", "-d 0"])
            .with_alias("-t", &["--threads"]);

        let argv = def
            .expand_command("chunk.txt", &["--threads".into(), "3".into()], None, None)
            .unwrap();
        assert_eq!(argv, ["arjun", "-i", "chunk.txt", "--threads", "3", "-d", "0"]);
    }
}
