use std::collections::HashMap;

pub struct TemplateEngine;

impl TemplateEngine {
    // Templates embedded at compile time
    const SIMULATED_SEARCH_RESULTS: &'static str = include_str!("../templates/simulated_search_results.txt");
    const SEARCH_CONTEXT: &'static str = include_str!("../templates/search_context.txt");
    const WEB_SEARCH_INSTRUCTION: &'static str = include_str!("../templates/web_search_instruction.txt");
    const OFFLINE_ADVICE: &'static str = include_str!("../templates/offline_advice.txt");

    /// Placeholders are `{{NAME}}`. Substituted values are copied as-is and
    /// never rescanned; unknown placeholders stay in the output.
    #[must_use]
    pub fn render(
        template: &str,
        variables: &HashMap<&str, &str>,
    ) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            result.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];

            match after_open.find("}}") {
                Some(end) => {
                    let name = &after_open[..end];
                    match variables.get(name) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(name);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[end + 2..];
                }
                None => {
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        result.push_str(rest);

        result.trim_end().to_string()
    }

    /// Render the canned search text used when no live search is available.
    #[must_use]
    pub fn render_simulated_search_results(
        brand: &str,
        query: &str,
        date: &str,
    ) -> String {
        let mut variables = HashMap::new();
        variables.insert("BRAND", brand);
        variables.insert("QUERY", query);
        variables.insert("DATE", date);

        Self::render(Self::SIMULATED_SEARCH_RESULTS, &variables)
    }

    /// Render the system message that carries search results into the conversation.
    #[must_use]
    pub fn render_search_context(
        query: &str,
        results: &str,
    ) -> String {
        let mut variables = HashMap::new();
        variables.insert("QUERY", query);
        variables.insert("RESULTS", results);

        Self::render(Self::SEARCH_CONTEXT, &variables)
    }

    /// Render the suffix appended to a system prompt when web search is on.
    #[must_use]
    pub fn render_web_search_instruction(brand: &str) -> String {
        let mut variables = HashMap::new();
        variables.insert("BRAND", brand);

        Self::render(Self::WEB_SEARCH_INSTRUCTION, &variables)
    }

    #[must_use]
    pub fn render_offline_advice(brand: &str) -> String {
        let mut variables = HashMap::new();
        variables.insert("BRAND", brand);

        Self::render(Self::OFFLINE_ADVICE, &variables)
    }
}
