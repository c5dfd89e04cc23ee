//! Template presentation: list text and json.

use crate::context::Template;
use crate::error::GroveError;

pub fn format_template_list_text(templates: &[Template]) -> String {
    if templates.is_empty() {
        return "No templates.".to_string();
    }
    let mut output = String::new();
    for template in templates {
        output.push_str(&format!("  {}", template.name));
        if let Some(base) = &template.base {
            output.push_str(&format!(" (base: {})", base));
        }
        if let Some(agent) = &template.agent {
            output.push_str(&format!(" [{}]", agent));
        }
        if let Some(strategy) = &template.strategy {
            output.push_str(&format!(" ({})", strategy));
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}

pub fn format_template_list_json(templates: &[Template]) -> Result<String, GroveError> {
    Ok(serde_json::to_string_pretty(templates)?)
}
