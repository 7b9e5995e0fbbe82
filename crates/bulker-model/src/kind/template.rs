use crate::TemplateError;

const INPUT: &str = "{input}";
const ARGS: &str = "{args}";
const AUTO: &str = "{auto_optimizations}";
const OUTPUT: &str = "{output}";
const WORDLIST: &str = "{wordlist}";

/// Values substituted into a command template.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub input: &'a str,
    pub args: &'a [String],
    pub auto_optimizations: &'a [String],
    pub output: Option<&'a str>,
    pub wordlist: Option<&'a str>,
}

/// Expands a command template into an argv vector.
///
/// The template is split with POSIX shell quoting rules first and placeholders
/// are substituted per token, so substituted values never get re-split:
/// - a token that is exactly `{args}` / `{auto_optimizations}` expands to zero
///   or more argv entries;
/// - a token that is exactly `{output}` disappears when there is no output path;
/// - inside any other token placeholders are replaced textually and tokens left
///   empty are dropped.
///
/// User args and auto-tuning entries missing from the template are appended,
/// in that order.
pub fn expand_template(
    template: &str,
    vars: &TemplateVars<'_>,
) -> Result<Vec<String>, TemplateError> {
    if template.trim().is_empty() {
        return Err(TemplateError::Empty);
    }
    let tokens =
        shlex::split(template).ok_or_else(|| TemplateError::Unbalanced(template.to_string()))?;

    let mut argv =
        Vec::with_capacity(tokens.len() + vars.args.len() + vars.auto_optimizations.len());
    let mut saw_args = false;
    let mut saw_auto = false;

    for token in tokens {
        match token.as_str() {
            ARGS => {
                saw_args = true;
                argv.extend(vars.args.iter().cloned());
            }
            AUTO => {
                saw_auto = true;
                argv.extend(vars.auto_optimizations.iter().cloned());
            }
            OUTPUT => {
                if let Some(output) = vars.output {
                    argv.push(output.to_string());
                }
            }
            _ => {
                saw_args |= token.contains(ARGS);
                saw_auto |= token.contains(AUTO);
                let expanded = substitute(&token, vars);
                if !expanded.is_empty() {
                    argv.push(expanded);
                }
            }
        }
    }

    if !saw_args {
        argv.extend(vars.args.iter().cloned());
    }
    if !saw_auto {
        argv.extend(vars.auto_optimizations.iter().cloned());
    }

    if argv.first().is_none_or(|program| program.is_empty()) {
        return Err(TemplateError::Empty);
    }
    Ok(argv)
}

fn substitute(token: &str, vars: &TemplateVars<'_>) -> String {
    if !token.contains('{') {
        return token.to_string();
    }
    token
        .replace(INPUT, vars.input)
        .replace(ARGS, &vars.args.join(" "))
        .replace(AUTO, &vars.auto_optimizations.join(" "))
        .replace(OUTPUT, vars.output.unwrap_or_default())
        .replace(WORDLIST, vars.wordlist.unwrap_or_default())
}
