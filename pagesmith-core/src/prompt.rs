//! Generation prompts.

use crate::error::PipelineError;
use crate::types::{ContainerName, ENTRY_FILE, FileRecord, Mode};

pub const NO_ATTACHMENTS: &str = "No attachments provided";
pub const NO_CHECKS: &str = "No checks provided";

const CREATE_INSTRUCTIONS: &str = r#"You are to create a complete single-file static web application based on this brief:"#;

const REVISE_INSTRUCTIONS: &str = r#"You are to modify the existing single-file web application to satisfy this new brief, preserving prior behavior the brief does not contradict:"#;

const OUTPUT_RULES: &str = r#"Rules:
- Use HTML + JS + minimal CSS.
- The app must work when deployed to GitHub Pages: static hosting only, no server-side component.
- Output raw code only. No explanations, no prose, no markdown code fences."#;

/// Everything one prompt is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub brief: &'a str,
    pub attachments: &'a [FileRecord],
    pub checks: &'a [String],
    pub mode: Mode,
    pub container: &'a ContainerName,
}

/// Render the instruction block sent to the code generator.
pub fn build_prompt(input: &PromptInput<'_>) -> Result<String, PipelineError> {
    let brief = input.brief.trim();
    if brief.is_empty() {
        return Err(PipelineError::MissingBrief);
    }

    let mut out = String::new();
    match input.mode {
        Mode::Create => {
            out.push_str(CREATE_INSTRUCTIONS);
            out.push('\n');
            out.push_str(brief);
            out.push_str("\n\n");
        }
        Mode::Revise => {
            out.push_str(REVISE_INSTRUCTIONS);
            out.push('\n');
            out.push_str(brief);
            out.push_str("\n\n");
            out.push_str(&format!(
                "The app already exists in the GitHub repository {}. \
                 Return the full updated contents of {ENTRY_FILE}.\n\n",
                input.container
            ));
        }
    }

    out.push_str(OUTPUT_RULES);
    out.push_str(&format!(
        "\n- The app must remain a single file named {ENTRY_FILE}.\n\n"
    ));

    out.push_str("Attachments you can use:\n");
    out.push_str(&render_attachments(input.attachments));
    out.push_str("\n-------------\n");

    out.push_str("It must pass the following checks:\n");
    out.push_str(&render_checks(input.checks));
    out.push('\n');

    Ok(out)
}

fn render_attachments(files: &[FileRecord]) -> String {
    if files.is_empty() {
        return NO_ATTACHMENTS.to_string();
    }
    files
        .iter()
        .map(|f| {
            if f.binary {
                format!("{} (binary, base64-encoded)\n{}", f.name, f.content)
            } else {
                format!("{}\n{}", f.name, f.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_checks(checks: &[String]) -> String {
    if checks.is_empty() {
        return NO_CHECKS.to_string();
    }
    checks.join("\n")
}
