//! Per-context sections for `diff --all` and `log --all`.

use crate::context::Context;
use crate::error::GroveError;
use owo_colors::OwoColorize;

/// One section per context: a `name (branch)` header, then the git output indented.
///
/// Empty output prints `empty`; a failed git call prints `(no <what> available)`.
pub fn format_context_sections(
    sections: &[(Context, Result<String, GroveError>)],
    what: &str,
    empty: &str,
) -> String {
    if sections.is_empty() {
        return "No contexts.".to_string();
    }
    let mut output = String::new();
    for (context, result) in sections {
        output.push_str(&format!("{} ({})\n", context.name.bold().magenta(), context.branch));
        match result {
            Ok(text) if text.trim().is_empty() => output.push_str(&format!("  {}\n", empty)),
            Ok(text) => {
                for line in text.lines() {
                    output.push_str(&format!("  {}\n", line));
                }
            }
            Err(_) => output.push_str(&format!("  (no {} available)\n", what)),
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}
