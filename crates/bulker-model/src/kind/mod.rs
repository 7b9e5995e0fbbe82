mod tool;
pub use tool::{InputKind, ToolDefinition, ToolMode};

mod template;
pub use template::{TemplateVars, expand_template};

mod args;
pub use args::{OutputFlagRewrite, has_flag, merge_auto_tuning, rewrite_output_flags, strip_flags};
