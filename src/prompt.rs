use crate::models::GenerationParams;
use crate::templates::Template;

/// Persona instruction sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "You are PenPal AI, an expert creative writing partner. \
Always write in the language requested in the prompt. \
Your output should be highly creative, original, and formatted in Markdown. \
Do not include meta-commentary like 'Here is your story'. Just start writing.";

const OUTPUT_GUIDELINES: [&str; 3] = [
    "Focus on showing, not telling.",
    "Use sensory details.",
    "Ensure the output is coherent and structured.",
];

/// A rendered prompt ready to send: system instruction plus one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system_instruction: String,
    pub user_text: String,
}

/// Render the user prompt for `params` using the fields of `template`.
///
/// This is formatting only. Fields whose value is blank are skipped; nothing is
/// rejected here (see [`crate::validation`]).
pub fn build_prompt(params: &GenerationParams, template: &Template) -> Prompt {
    let mut text = format!(
        "Write a {} {} in the {} genre.",
        params.length,
        template.name.to_lowercase(),
        params.genre.trim()
    );

    let language = params.language.trim();
    if !language.is_empty() {
        text.push_str(&format!(" Write it in {language}."));
    }

    let tone = params.tone.trim();
    if !tone.is_empty() {
        text.push_str(&format!(" The tone should be {tone}."));
    }

    text.push_str("\n\nSpecific Details:\n");
    for field in template.fields {
        let value = params.input(field.key).map(str::trim).unwrap_or_default();
        if !value.is_empty() {
            text.push_str(&format!("- {}: {}\n", field.label, value));
        }
    }

    text.push_str("\nOutput Guidelines:\n");
    for line in OUTPUT_GUIDELINES {
        text.push_str("- ");
        text.push_str(line);
        text.push('\n');
    }

    Prompt {
        system_instruction: SYSTEM_INSTRUCTION.to_string(),
        user_text: text,
    }
}
