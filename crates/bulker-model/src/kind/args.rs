use std::collections::BTreeMap;

use crate::TemplateError;

/// Whether `flag` appears in `args`, either alone or as `flag=value`.
pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| matches_flag(arg, flag))
}

fn matches_flag(arg: &str, flag: &str) -> bool {
    arg == flag
        || arg
            .strip_prefix(flag)
            .is_some_and(|rest| rest.starts_with('='))
}

fn find_flag<'f>(arg: &str, flags: &[&'f str]) -> Option<&'f str> {
    flags.iter().copied().find(|flag| matches_flag(arg, flag))
}

/// Removes every occurrence of `flags` together with their values.
///
/// Returns the remaining args and the first flag that was removed.
pub fn strip_flags(args: &[String], flags: &[&str]) -> (Vec<String>, Option<String>) {
    let mut kept = Vec::with_capacity(args.len());
    let mut first = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match find_flag(arg, flags) {
            Some(flag) => {
                if arg == flag {
                    // value is the next argument
                    let _ = iter.next();
                }
                first.get_or_insert_with(|| flag.to_string());
            }
            None => kept.push(arg.clone()),
        }
    }
    (kept, first)
}

/// Result of pointing user output flags at a generated path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFlagRewrite {
    pub args: Vec<String>,
    /// First output flag the user supplied, if any.
    pub flag: Option<String>,
}

/// Keeps the user's output flags but replaces each of their values with `path`.
pub fn rewrite_output_flags(args: &[String], flags: &[&str], path: &str) -> OutputFlagRewrite {
    let mut out = Vec::with_capacity(args.len() + 1);
    let mut first = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match find_flag(arg, flags) {
            Some(flag) => {
                if arg == flag {
                    let _ = iter.next();
                }
                out.push(flag.to_string());
                out.push(path.to_string());
                first.get_or_insert_with(|| flag.to_string());
            }
            None => out.push(arg.clone()),
        }
    }
    OutputFlagRewrite {
        args: out,
        flag: first,
    }
}

/// Auto-tuning entries (`"-t 10"`) whose flag, or any alias of it, the user
/// did not already pass. User values always win.
pub fn merge_auto_tuning(
    entries: &[String],
    aliases: &BTreeMap<String, Vec<String>>,
    user_args: &[String],
) -> Result<Vec<String>, TemplateError> {
    let mut merged = Vec::new();

    for entry in entries {
        let tokens = shlex::split(entry).ok_or_else(|| TemplateError::Unbalanced(entry.clone()))?;
        let Some(flag) = tokens.first() else {
            continue;
        };

        let overridden = has_flag(user_args, flag)
            || aliases
                .get(flag)
                .is_some_and(|alts| alts.iter().any(|alt| has_flag(user_args, alt)));
        if !overridden {
            merged.extend(tokens);
        }
    }
    Ok(merged)
}
