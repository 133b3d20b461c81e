//! Model-name routing — maps raw model names onto provider catalogs.
//!
//! Two of the catalogs (OpenAI and Together) share one wire protocol and are
//! told apart purely by model-name membership, so the tables below are the
//! routing decision, not a hint.

use std::fmt;

/// A chat-completion backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// OpenAI catalog over the OpenAI-compatible protocol.
    OpenAi,
    /// Together catalog over the same OpenAI-compatible protocol, reached
    /// via a different base URL and credential.
    Together,
    Google,
    Anthropic,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::OpenAi,
        Provider::Together,
        Provider::Google,
        Provider::Anthropic,
    ];

    /// Environment variable holding this provider's secret.
    pub const fn env_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Together => "TOGETHER_API_KEY",
            Provider::Google => "GEMINI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Together => "together",
            Provider::Google => "google",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A raw model name resolved to its provider and canonical id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub provider: Provider,
    pub model: String,
}

/// Google models accepted verbatim.
const GOOGLE_MODELS: &[&str] = &[
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-2.5-pro-preview-03-25",
    "gemini-2.5-flash-preview-04-17",
];

/// Rolling Google names pinned to their dated previews.
const GOOGLE_ALIASES: &[(&str, &str)] = &[
    ("gemini-2.5-pro", "gemini-2.5-pro-preview-03-25"),
    ("gemini-2.5-flash", "gemini-2.5-flash-preview-04-17"),
];

/// OpenAI catalog; names pass through unchanged.
const OPENAI_MODELS: &[&str] = &[
    "gpt-4o",
    "chatgpt-4o-latest",
    "gpt-4o-2024-08-06",
    "gpt-4o-mini",
    "gpt-4o-mini-2024-07-18",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
];

/// Together short names mapped to full vendor-qualified ids.
const TOGETHER_ALIASES: &[(&str, &str)] = &[
    ("llama3.1-8b", "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo"),
    ("llama3.1-70b", "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo"),
    ("gemma2-27b", "google/gemma-2-27b-it"),
    ("gemma2-9b", "google/gemma-2-9b-it"),
    ("qwen2-72b", "Qwen/Qwen2-72B-Instruct"),
    ("qwen2.5-72b", "Qwen/Qwen2.5-72B-Instruct-Turbo"),
    ("qwen2.5-7b", "Qwen/Qwen2.5-7B-Instruct-Turbo"),
];

/// Anthropic short names mapped to their `-latest` ids.
const ANTHROPIC_ALIASES: &[(&str, &str)] = &[
    ("claude-3.5-sonnet", "claude-3-5-sonnet-latest"),
    ("claude-3.5-haiku", "claude-3-5-haiku-latest"),
    ("claude-3.7-sonnet", "claude-3-7-sonnet-latest"),
    ("claude-3-opus", "claude-3-opus-latest"),
];

/// Anthropic `-latest` ids accepted verbatim.
const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-sonnet-latest",
    "claude-3-5-haiku-latest",
    "claude-3-7-sonnet-latest",
    "claude-3-opus-latest",
];

fn alias_lookup(table: &[(&str, &str)], name: &str) -> Option<String> {
    table
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| (*canonical).to_string())
}

/// Resolve a raw model name to `(provider, canonical id)`.
///
/// Matching trims whitespace and lowercases; unknown names resolve to `None`.
pub fn resolve_model(raw: &str) -> Option<ResolvedModel> {
    let name = raw.trim().to_lowercase();

    if let Some(model) = alias_lookup(GOOGLE_ALIASES, &name) {
        return Some(ResolvedModel {
            provider: Provider::Google,
            model,
        });
    }
    if GOOGLE_MODELS.contains(&name.as_str()) {
        return Some(ResolvedModel {
            provider: Provider::Google,
            model: name,
        });
    }

    if OPENAI_MODELS.contains(&name.as_str()) {
        return Some(ResolvedModel {
            provider: Provider::OpenAi,
            model: name,
        });
    }

    if let Some(model) = alias_lookup(TOGETHER_ALIASES, &name) {
        return Some(ResolvedModel {
            provider: Provider::Together,
            model,
        });
    }

    if let Some(model) = alias_lookup(ANTHROPIC_ALIASES, &name) {
        return Some(ResolvedModel {
            provider: Provider::Anthropic,
            model,
        });
    }
    if ANTHROPIC_MODELS.contains(&name.as_str()) {
        return Some(ResolvedModel {
            provider: Provider::Anthropic,
            model: name,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_rolling_name_pins_to_dated_preview() {
        let resolved = resolve_model("gemini-2.5-pro").unwrap();
        assert_eq!(resolved.provider, Provider::Google);
        assert_eq!(resolved.model, "gemini-2.5-pro-preview-03-25");

        let resolved = resolve_model("gemini-2.5-flash").unwrap();
        assert_eq!(resolved.model, "gemini-2.5-flash-preview-04-17");
    }

    #[test]
    fn google_dated_preview_passes_through() {
        let resolved = resolve_model("gemini-2.5-pro-preview-03-25").unwrap();
        assert_eq!(resolved.provider, Provider::Google);
        assert_eq!(resolved.model, "gemini-2.5-pro-preview-03-25");
    }

    #[test]
    fn openai_names_pass_through() {
        let resolved = resolve_model("gpt-4o-mini").unwrap();
        assert_eq!(resolved.provider, Provider::OpenAi);
        assert_eq!(resolved.model, "gpt-4o-mini");
    }

    #[test]
    fn together_short_name_maps_to_vendor_qualified_id() {
        let resolved = resolve_model("llama3.1-8b").unwrap();
        assert_eq!(resolved.provider, Provider::Together);
        assert_eq!(
            resolved.model,
            "meta-llama/Meta-Llama-3.1-8B-Instruct-Turbo"
        );

        let resolved = resolve_model("qwen2.5-7b").unwrap();
        assert_eq!(resolved.model, "Qwen/Qwen2.5-7B-Instruct-Turbo");
    }

    #[test]
    fn anthropic_short_name_maps_to_latest() {
        let resolved = resolve_model("claude-3.5-sonnet").unwrap();
        assert_eq!(resolved.provider, Provider::Anthropic);
        assert_eq!(resolved.model, "claude-3-5-sonnet-latest");
    }

    #[test]
    fn anthropic_latest_id_passes_through() {
        let resolved = resolve_model("claude-3-5-haiku-latest").unwrap();
        assert_eq!(resolved.provider, Provider::Anthropic);
        assert_eq!(resolved.model, "claude-3-5-haiku-latest");
    }

    #[test]
    fn matching_is_case_insensitive_and_trimmed() {
        let resolved = resolve_model("  GPT-4o \n").unwrap();
        assert_eq!(resolved.provider, Provider::OpenAi);
        assert_eq!(resolved.model, "gpt-4o");

        let resolved = resolve_model("Gemini-2.5-Pro").unwrap();
        assert_eq!(resolved.model, "gemini-2.5-pro-preview-03-25");
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        assert!(resolve_model("gpt-99-ultra").is_none());
        assert!(resolve_model("").is_none());
    }

    #[test]
    fn provider_env_vars_are_distinct() {
        let vars: Vec<&str> = Provider::ALL.iter().map(|p| p.env_var()).collect();
        for (i, var) in vars.iter().enumerate() {
            assert!(!vars[i + 1..].contains(var));
        }
    }
}
