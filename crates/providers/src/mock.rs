//! The deterministic mock response engine.
//!
//! A pure function of its inputs: model name, temperature, the user message,
//! and the attachment-context corpus. Synthesizes a reply whenever no live
//! provider output is available, and also supplies the behavior-descriptor
//! prefix that decorates live provider replies.

/// A tool the mock engine pretends to invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: &'static str,
    pub output: String,
}

/// The behavior prefix derived from model name, temperature, and message.
#[derive(Debug, Clone)]
pub struct BehaviorDescriptor {
    /// Always `[{model}] `.
    pub prefix: String,
    /// Tone clause + temperature marker + tool marker, possibly empty.
    pub behavior: String,
    /// The single tool that fired, if any.
    pub tool: Option<ToolInvocation>,
}

impl BehaviorDescriptor {
    /// Decorate a live provider reply with the descriptor prefix.
    pub fn decorate(&self, text: &str) -> String {
        format!("{}{}{}", self.prefix, self.behavior, text)
    }
}

/// Keyword → tool table. Evaluated in order; the first match wins, so a
/// message containing both "search" and "weather" triggers only the search
/// tool.
const TOOL_TRIGGERS: [(&str, &str); 2] = [
    ("search", "Web Search Tool"),
    ("weather", "Weather API"),
];

/// Words this short are excluded from the relevance filter to avoid noise
/// from common short words.
const MIN_KEYWORD_LEN: usize = 4;

/// Maximum context lines surfaced in a response.
const MAX_CONTEXT_LINES: usize = 5;

/// Rule-based deterministic text generator.
pub struct MockEngine;

impl MockEngine {
    /// Build the behavior descriptor for a message.
    ///
    /// Rules applied in order: model-name prefix, personality clause,
    /// temperature clause, tool-trigger clause.
    pub fn describe(message: &str, model: &str, temperature: f64) -> BehaviorDescriptor {
        let prefix = format!("[{model}] ");

        let mut behavior = if model.contains("creative") {
            "I'm feeling creative! ".to_string()
        } else if model.contains("precise") {
            "Precisely: ".to_string()
        } else {
            String::new()
        };

        if temperature > 1.5 {
            behavior.push_str("(Highly Random) ");
        } else if temperature < 0.3 {
            behavior.push_str("(Deterministic) ");
        }

        let lowered = message.to_lowercase();
        let mut tool = None;
        for (keyword, name) in TOOL_TRIGGERS {
            if lowered.contains(keyword) {
                let output = match name {
                    "Web Search Tool" => {
                        format!("Successfully searched for '{message}'. Found 3 relevant results.")
                    }
                    _ => "Current weather: 72°F, Sunny.".to_string(),
                };
                behavior.push_str(&format!("[System: Used {name}] "));
                tool = Some(ToolInvocation { name, output });
                break;
            }
        }

        BehaviorDescriptor {
            prefix,
            behavior,
            tool,
        }
    }

    /// Filter the context corpus down to lines relevant to the message.
    ///
    /// Keeps lines containing any message word longer than three characters
    /// (case-insensitive), capped at five lines. Substitutes the literal
    /// "general context" when nothing matches.
    pub fn filter_context(message: &str, context: &str) -> String {
        let lowered = message.to_lowercase();
        let keywords: Vec<&str> = lowered
            .split_whitespace()
            .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
            .collect();

        let relevant: Vec<&str> = context
            .lines()
            .filter(|line| {
                let line_lower = line.to_lowercase();
                keywords.iter().any(|w| line_lower.contains(w))
            })
            .take(MAX_CONTEXT_LINES)
            .collect();

        if relevant.is_empty() {
            "general context".to_string()
        } else {
            relevant.join("\n")
        }
    }

    /// Synthesize a full mock reply.
    pub fn generate(message: &str, model: &str, context: &str, temperature: f64) -> String {
        let descriptor = Self::describe(message, model, temperature);
        Self::generate_with(&descriptor, message, context)
    }

    /// Synthesize a mock reply from a precomputed descriptor.
    pub fn generate_with(descriptor: &BehaviorDescriptor, message: &str, context: &str) -> String {
        let BehaviorDescriptor {
            prefix,
            behavior,
            tool,
        } = descriptor;

        if !context.is_empty() {
            let context_str = Self::filter_context(message, context);
            let response = format!(
                "{prefix}{behavior}Based on the documents: '{context_str}', here is my response to '{message}'"
            );
            if let Some(tool) = tool {
                return format!(
                    "{prefix}{behavior}I used the {}. Result: {}. Based on that and your documents: {response}",
                    tool.name, tool.output
                );
            }
            return response;
        }

        format!("{prefix}{behavior}This is a mock response to: '{message}'")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_prefix_always_present() {
        let reply = MockEngine::generate("hello", "aura-standard", "", 0.7);
        assert!(reply.starts_with("[aura-standard] "));
    }

    #[test]
    fn creative_model_adds_tone_clause() {
        let reply = MockEngine::generate("hello", "aura-creative", "", 0.7);
        assert!(reply.starts_with("[aura-creative] I'm feeling creative! "));
    }

    #[test]
    fn precise_model_adds_tone_clause() {
        let reply = MockEngine::generate("hello", "aura-precise", "", 0.7);
        assert!(reply.starts_with("[aura-precise] Precisely: "));
    }

    #[test]
    fn neutral_model_has_no_tone_clause() {
        let reply = MockEngine::generate("hello", "aura-standard", "", 0.7);
        assert_eq!(
            reply,
            "[aura-standard] This is a mock response to: 'hello'"
        );
    }

    #[test]
    fn high_temperature_marker() {
        let reply = MockEngine::generate("hello", "aura-standard", "", 1.6);
        assert!(reply.contains("(Highly Random) "));
    }

    #[test]
    fn low_temperature_marker() {
        let reply = MockEngine::generate("hello", "aura-standard", "", 0.2);
        assert!(reply.contains("(Deterministic) "));
    }

    #[test]
    fn mid_band_temperature_has_no_marker() {
        for t in [0.3, 0.7, 1.0, 1.5] {
            let reply = MockEngine::generate("hello", "aura-standard", "", t);
            assert!(!reply.contains("Highly Random"), "t = {t}");
            assert!(!reply.contains("Deterministic"), "t = {t}");
        }
    }

    #[test]
    fn search_keyword_triggers_web_search_tool() {
        let reply = MockEngine::generate("please Search for cats", "aura-standard", "", 0.7);
        assert!(reply.contains("[System: Used Web Search Tool] "));
        assert!(reply.contains("This is a mock response to: 'please Search for cats'"));
    }

    #[test]
    fn weather_keyword_triggers_weather_api() {
        let reply = MockEngine::generate("what's the WEATHER like", "aura-standard", "", 0.7);
        assert!(reply.contains("[System: Used Weather API] "));
    }

    #[test]
    fn search_wins_over_weather() {
        let reply = MockEngine::generate("search the weather", "aura-standard", "", 0.7);
        assert!(reply.contains("Web Search Tool"));
        assert!(!reply.contains("Weather API"));
    }

    #[test]
    fn context_filter_keeps_matching_lines() {
        let context = "The secret code is AURA-2026.\nUnrelated line about gardening.";
        let reply = MockEngine::generate("What is the secret code?", "aura-creative", context, 0.7);
        assert!(reply.contains("AURA-2026"));
        assert!(!reply.contains("gardening"));
        assert!(reply.contains("here is my response to 'What is the secret code?'"));
    }

    #[test]
    fn context_filter_ignores_short_words() {
        // Only words longer than three characters participate; "is" and "the"
        // must not pull in unrelated lines.
        let context = "this line is about nothing\nsecret stuff here";
        let filtered = MockEngine::filter_context("is the secret safe", context);
        assert_eq!(filtered, "secret stuff here");
    }

    #[test]
    fn context_filter_caps_at_five_lines() {
        let context = (0..10)
            .map(|i| format!("topic line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let filtered = MockEngine::filter_context("tell me about the topic", &context);
        assert_eq!(filtered.lines().count(), 5);
    }

    #[test]
    fn no_matching_lines_substitutes_general_context() {
        let reply = MockEngine::generate("hello there", "aura-standard", "completely unrelated corpus", 0.7);
        assert!(reply.contains("'general context'"));
    }

    #[test]
    fn tool_plus_context_wraps_response() {
        let context = "search results live in documents";
        let reply = MockEngine::generate("search for things", "aura-standard", context, 0.7);
        // The canned output ends in a period and the wrap adds its own,
        // yielding the doubled "results.." sequence.
        assert!(reply.contains("I used the Web Search Tool. Result: Successfully searched for 'search for things'. Found 3 relevant results.. Based on that and your documents:"));
    }

    #[test]
    fn generate_is_deterministic() {
        let a = MockEngine::generate("search for cats", "aura-creative", "ctx line", 1.9);
        let b = MockEngine::generate("search for cats", "aura-creative", "ctx line", 1.9);
        assert_eq!(a, b);
    }

    #[test]
    fn decorate_prepends_descriptor() {
        let descriptor = MockEngine::describe("hello", "aura-precise", 0.1);
        assert_eq!(
            descriptor.decorate("live reply"),
            "[aura-precise] Precisely: (Deterministic) live reply"
        );
    }
}
