use std::{io::Write, path::Path, process::ExitCode};

use anyhow::{Context, Result};
use bulker_core::{Runner, ToolCatalog};
use bulker_observe::log_report;
use tracing::{info, warn};

use crate::cli::RunArgs;

pub async fn run(args: &RunArgs, config: Option<&Path>) -> Result<ExitCode> {
    let catalog = ToolCatalog::discover(config).context("loading tool catalog")?;
    let cfg = args.to_config()?;
    let runner = Runner::from_catalog(cfg, &catalog)
        .with_context(|| format!("resolving tool {:?}", args.tool))?;

    let report = runner
        .run()
        .await
        .with_context(|| format!("running {}", args.tool))?;
    log_report(&report);

    if report.interrupted {
        warn!(output = %report.output_path.display(), "partial output kept after interrupt");
        return Ok(ExitCode::SUCCESS);
    }
    if report.counts.failed > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn list(config: Option<&Path>) -> Result<ExitCode> {
    let catalog = ToolCatalog::discover(config).context("loading tool catalog")?;
    match catalog.source() {
        Some(path) => info!(path = %path.display(), "tool catalog"),
        None => info!("no config file found; listing built-in tools"),
    }

    let mut out = std::io::stdout().lock();
    write_tools(&mut out, &catalog)?;
    Ok(ExitCode::SUCCESS)
}

fn write_tools(out: &mut impl Write, catalog: &ToolCatalog) -> Result<()> {
    writeln!(out, "Available tools:")?;
    for def in catalog.tools() {
        writeln!(out)?;
        writeln!(out, "{}", def.name)?;
        if !def.description.is_empty() {
            writeln!(out, "  Description: {}", def.description)?;
        }
        writeln!(out, "  Mode: {}", def.mode)?;
        if !def.auto_optimizations.is_empty() {
            writeln!(
                out,
                "  Auto optimizations: {}",
                def.auto_optimizations.join(" ")
            )?;
        }
        if !def.examples.is_empty() {
            writeln!(out, "  Examples:")?;
            for example in &def.examples {
                writeln!(out, "    {example}")?;
            }
        }
    }
    writeln!(out)?;
    writeln!(
        out,
        "Usage: bulker run <tool> -i <input> -o <output> [-t N] [-e 'args'] [-- tool args]"
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_builtin_echo() {
        let mut buf = Vec::new();
        write_tools(&mut buf, &ToolCatalog::builtin()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Available tools:"));
        assert!(text.contains("\necho\n"));
        assert!(text.contains("  Mode: multiple"));
    }

    #[test]
    fn lists_catalog_entries_sorted() {
        let toml = r#"
[tools.zeta]
description = "last"
command = "zeta {input}"

[tools.alpha]
description = "first"
command = "alpha -l {input} {args} {auto_optimizations}"
auto_optimizations = ["-t 10", "--silent"]
examples = ["bulker run alpha -i hosts.txt -o out.txt"]
"#;
        let catalog = ToolCatalog::from_toml_str(toml, Path::new("tools.toml")).unwrap();
        let mut buf = Vec::new();
        write_tools(&mut buf, &catalog).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let alpha = text.find("\nalpha\n").unwrap();
        let zeta = text.find("\nzeta\n").unwrap();
        assert!(alpha < zeta);
        assert!(text.contains("  Auto optimizations: -t 10 --silent"));
        assert!(text.contains("    bulker run alpha -i hosts.txt -o out.txt"));
    }
}
