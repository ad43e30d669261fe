use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use include_dir::{include_dir, Dir};
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::models::tool::Tool;

static PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

#[derive(Serialize)]
struct SystemContext<'a> {
    inline: bool,
    tools: &'a [Tool],
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render a template from disk, falling back to the prompts bundled in the crate
pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    let template_content = if template_path.exists() {
        fs::read_to_string(&template_path)
            .map_err(|e| TeraError::chain("Failed to read template file", e))?
    } else {
        PROMPTS
            .get_file(&template_path)
            .and_then(|file| file.contents_utf8())
            .map(String::from)
            .ok_or_else(|| {
                TeraError::msg(format!("Unknown prompt template {}", template_path.display()))
            })?
    };
    load_prompt(&template_content, context_data)
}

/// Instruction for the first stream. `inline_tools` is set for models that
/// cannot call functions and must write tool markers themselves.
pub fn system_prompt(inline_tools: Option<&[Tool]>) -> Result<String, TeraError> {
    let context = SystemContext {
        inline: inline_tools.is_some(),
        tools: inline_tools.unwrap_or_default(),
    };
    load_prompt_file("system.md", &context)
}

pub fn summarizer_prompt() -> Result<String, TeraError> {
    load_prompt_file("summarizer.md", &HashMap::<String, String>::new())
}
