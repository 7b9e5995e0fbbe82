use bulker_model::{InputKind, ToolDefinition, ToolMode};

/// Tools available without any config file.
pub(super) fn tools() -> Vec<ToolDefinition> {
    vec![echo()]
}

/// Relays each chunk's lines to the output unchanged.
fn echo() -> ToolDefinition {
    let mut def = ToolDefinition::new("echo", "echo {input}")
        .with_mode(ToolMode::Multiple)
        .with_input(InputKind::Inline);
    def.description = "Copy input lines to the output (pipeline check)".into();
    def.examples = vec!["bulker run echo -i urls.txt -o copy.txt -t 4".into()];
    def
}
