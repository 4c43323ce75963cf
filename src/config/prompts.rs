//! Prompt templates for CaseLink.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub rag: RagPrompts,
    pub report: ReportPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for question answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagPrompts {
    /// Instruction template, rendered with `{{context}}` and `{{question}}`.
    pub qa: String,
    /// Rewrites a follow-up into a standalone question, rendered with
    /// `{{chat_history}}` and `{{question}}`.
    pub condense: String,
}

impl Default for RagPrompts {
    fn default() -> Self {
        Self {
            qa: r#"You are an assistant specialized in police investigations. You answer questions strictly related to police reports, criminal activities, suspects, or investigations based on the provided report context.
Guidelines:
- Only respond to questions relevant to the context of investigations, crime reports, suspects, or legal matters.
- If the question is unrelated, politely decline to answer.
- Refer to Indian law sections and articles based on your knowledge.
- If the answer is unknown or the information is not available, respond with "I don't know."
- Do not fabricate information or assumptions.
- If the input is just a greeting or small talk, reply in a friendly and human-like way.
- If the question is about a specific section of law, provide a brief explanation of that section.
- If the question refers to a report or document not included in the provided context, state that the data is unavailable.
- All responses must be in **English**, concise, factual, and directly relevant to the question.
Use the following context to answer:
{{context}}
Question: {{question}}
Answer:"#
                .to_string(),

            condense: r#"Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.

Chat History:
{{chat_history}}
Follow Up Input: {{question}}
Standalone question:"#
                .to_string(),
        }
    }
}

/// Prompts for video report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportPrompts {
    pub instruction: String,
}

impl Default for ReportPrompts {
    fn default() -> Self {
        Self {
            instruction: r#"You are analyzing a full video. Provide the following details:

1. Incident Overview: Describe what happened, environmental conditions (e.g., lighting, weather).
2. Suspects: Provide details on their appearance, actions, and any distinguishing features.
3. Victims/Witnesses: If visible, describe them, including their actions.
4. Vehicles: Describe any vehicles, license plates, and their interaction with the crime scene.
5. Affected Items: Describe items impacted during the incident (e.g., ATM, its condition before and after).
6. Suspicious Activities: Identify illegal activities and summarize the sequence of events.
7. Conversations/Sounds: Analyze any audible conversations or sounds relevant to the crime scene.
8. Additional Details: Mention any visible landmarks, signboards, or other context about the scene.

Summarize all information and generate a comprehensive report for the police investigation."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let rag_path = custom_path.join("rag.toml");
            if rag_path.exists() {
                let content = std::fs::read_to_string(&rag_path)?;
                prompts.rag = toml::from_str(&content)?;
            }

            let report_path = custom_path.join("report.toml");
            if report_path.exists() {
                let content = std::fs::read_to_string(&report_path)?;
                prompts.report = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// The template is scanned once, left to right. Substituted values are never
    /// rescanned, and placeholders with no matching variable are kept as written.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];

            let Some(close) = after_open.find("}}") else {
                result.push_str(&rest[open..]);
                return result;
            };

            let key = &after_open[..close];
            match vars.get(key.trim()) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after_open[close + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.rag.qa.contains("{{context}}"));
        assert!(prompts.rag.qa.contains("{{question}}"));
        assert!(prompts.rag.condense.contains("{{chat_history}}"));
        for field in [
            "Incident Overview",
            "Suspects",
            "Victims/Witnesses",
            "Vehicles",
            "Affected Items",
            "Suspicious Activities",
            "Conversations/Sounds",
            "Additional Details",
        ] {
            assert!(prompts.report.instruction.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let mut vars = HashMap::new();
        vars.insert("context".to_string(), "CTX".to_string());
        vars.insert("question".to_string(), "what about {{context}}?".to_string());

        for _ in 0..8 {
            assert_eq!(
                Prompts::render("C={{context}} Q={{question}}", &vars),
                "C=CTX Q=what about {{context}}?"
            );
        }
    }

    #[test]
    fn test_unknown_and_unclosed_placeholders_are_kept() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());

        assert_eq!(
            Prompts::render("{{name}} saw {{plate}} at {{ name }}", &vars),
            "Alice saw {{plate}} at Alice"
        );
        assert_eq!(Prompts::render("{{name}} and {{open", &vars), "Alice and {{open");
        assert_eq!(Prompts::render("no placeholders", &vars), "no placeholders");
    }

    #[test]
    fn test_custom_variables_yield_to_provided() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("station".to_string(), "Koramangala PS".to_string());
        prompts.variables.insert("question".to_string(), "ignored".to_string());

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "Who fled?".to_string());

        let rendered = prompts.render_with_custom("{{station}}: {{question}}", &vars);
        assert_eq!(rendered, "Koramangala PS: Who fled?");
    }

    #[test]
    fn test_load_custom_rag_prompts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("rag.toml"),
            "qa = \"Context: {{context}} Q: {{question}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.rag.qa, "Context: {{context}} Q: {{question}}");
        // Unspecified fields keep their defaults.
        assert!(prompts.rag.condense.contains("Standalone question"));
        assert!(prompts.report.instruction.contains("Incident Overview"));
    }
}
