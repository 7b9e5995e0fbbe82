use std::sync::Arc;

use bulker_model::{InputKind, ToolDefinition};
use tracing::{instrument, trace};

use crate::{
    error::ExecError,
    strategy::{InlineStrategy, StagedStrategy, StagingArea, ToolStrategy},
};

/// Run-wide inputs every strategy may need.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub staging: StagingArea,
    pub wordlist: Option<String>,
}

impl BuildContext {
    pub fn new(staging: StagingArea) -> Self {
        Self {
            staging,
            wordlist: None,
        }
    }

    pub fn with_wordlist(mut self, wordlist: Option<String>) -> Self {
        self.wordlist = wordlist;
        self
    }
}

/// Creates a strategy for the tool definitions it supports.
pub trait StrategyBuilder: Send + Sync {
    fn name(&self) -> &'static str;
    fn supports(&self, def: &ToolDefinition) -> bool;
    fn build(
        &self,
        def: Arc<ToolDefinition>,
        ctx: &BuildContext,
    ) -> Result<Arc<dyn ToolStrategy>, ExecError>;
}

/// `input = "inline"` tools.
pub struct InlineBuilder;

impl StrategyBuilder for InlineBuilder {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn supports(&self, def: &ToolDefinition) -> bool {
        def.input == InputKind::Inline
    }

    fn build(
        &self,
        def: Arc<ToolDefinition>,
        ctx: &BuildContext,
    ) -> Result<Arc<dyn ToolStrategy>, ExecError> {
        Ok(Arc::new(InlineStrategy::new(def, ctx.wordlist.clone())))
    }
}

/// `input = "file"` tools, with or without self-managed output.
pub struct StagedBuilder;

impl StrategyBuilder for StagedBuilder {
    fn name(&self) -> &'static str {
        "staged"
    }

    fn supports(&self, def: &ToolDefinition) -> bool {
        def.input == InputKind::File
    }

    fn build(
        &self,
        def: Arc<ToolDefinition>,
        ctx: &BuildContext,
    ) -> Result<Arc<dyn ToolStrategy>, ExecError> {
        Ok(Arc::new(StagedStrategy::new(
            def,
            ctx.staging.clone(),
            ctx.wordlist.clone(),
        )))
    }
}

/// Picks the first registered builder that supports a definition.
pub struct StrategyRouter {
    builders: Vec<Arc<dyn StrategyBuilder>>,
    ctx: BuildContext,
}

impl StrategyRouter {
    #[inline]
    pub fn new(ctx: BuildContext) -> Self {
        Self {
            builders: Vec::new(),
            ctx,
        }
    }

    /// Router with the built-in inline and staged strategies.
    pub fn with_defaults(ctx: BuildContext) -> Self {
        let mut router = Self::new(ctx);
        router.register(Arc::new(InlineBuilder));
        router.register(Arc::new(StagedBuilder));
        router
    }

    #[inline]
    pub fn register(&mut self, builder: Arc<dyn StrategyBuilder>) {
        self.builders.push(builder);
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn pick(&self, def: &ToolDefinition) -> Option<&Arc<dyn StrategyBuilder>> {
        self.builders.iter().find(|b| b.supports(def))
    }

    #[instrument(level = "trace", skip(self, def), fields(tool = %def.name))]
    pub fn build(&self, def: Arc<ToolDefinition>) -> Result<Arc<dyn ToolStrategy>, ExecError> {
        let b = self
            .pick(&def)
            .ok_or_else(|| ExecError::NoStrategy(def.name.clone()))?;

        let strategy = b.build(def.clone(), &self.ctx)?;
        trace!(builder = b.name(), "strategy built successfully");
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> BuildContext {
        BuildContext::new(StagingArea::with_run_id("/tmp", "r"))
    }

    #[test]
    fn routes_by_input_kind() {
        let router = StrategyRouter::with_defaults(ctx());

        let inline = ToolDefinition::new("echo", "echo {input}").with_input(InputKind::Inline);
        let s = router.build(Arc::new(inline)).unwrap();
        assert!(!s.needs_staged_input());
        assert_eq!(s.name(), "echo");

        let staged = ToolDefinition::new("arjun", "arjun -i {input}").with_file_output(&["-oT"]);
        let s = router.build(Arc::new(staged)).unwrap();
        assert!(s.needs_staged_input());
        assert!(s.file_output().is_some());
    }

    #[test]
    fn empty_router_has_no_strategy() {
        let router = StrategyRouter::new(ctx());
        let def = ToolDefinition::new("httpx", "httpx -l {input}");
        assert!(matches!(
            router.build(Arc::new(def)),
            Err(ExecError::NoStrategy(name)) if name == "httpx"
        ));
    }
}
