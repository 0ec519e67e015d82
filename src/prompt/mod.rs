//! Prompt construction.
//!
//! Prompts are plain text built from the [`ResearchQuery`]; no network access
//! happens here. Every prompt that expects free-text citations shows the exact
//! `Source: [name] - URL: ...` line the citation parser recognizes.

use std::fmt::Write as _;

use crate::query::{ConfigError, ResearchQuery};

/// Recommended citation count range for the main prompt.
const MAIN_SOURCE_RANGE: &str = "8-12";

/// Example citation line in the exact format the parser expects.
const CITATION_EXAMPLE: &str = "Source: [Autorité des marchés financiers] - URL: https://www.amf-france.org/fr/espace-epargnants/bien-investir";

/// Which prompt to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// Free-text answer with explicit citations.
    MainQuery,
    /// Answer as a JSON object with one entry per source.
    StructuredQuery,
    /// Request for additional, non-duplicate sources.
    FollowUpSources {
        /// Sources already harvested from this provider
        already_harvested: usize,
        /// Target count for this provider
        target_minimum: usize,
    },
    /// Re-emit the URLs already cited in `response_body` as a JSON list.
    SourceVerification {
        /// The provider's earlier answer
        response_body: String,
    },
}

impl PromptKind {
    /// Number of additional sources a follow-up prompt asks for.
    #[must_use]
    pub fn requested_additional(already_harvested: usize, target_minimum: usize) -> usize {
        target_minimum.saturating_sub(already_harvested).max(1)
    }
}

/// Builds prompt text for each [`PromptKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    /// Builds the prompt text for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyQuestion`] when the query's question is blank.
    pub fn build(kind: &PromptKind, query: &ResearchQuery) -> Result<String, ConfigError> {
        let question = query.question().trim();
        if question.is_empty() {
            return Err(ConfigError::EmptyQuestion);
        }

        let mut prompt = String::new();
        match kind {
            PromptKind::MainQuery => {
                push_question(&mut prompt, "Answer the following question in detail", question, query);
                let _ = write!(
                    prompt,
                    "\nCITING SOURCES IS MANDATORY:\n\
                     - Cite every source with its complete, exact URL\n\
                     - Use exactly this format, one source per line: \"Source: [Site name] - URL: https://example.com/full-page\"\n\
                     - Provide {MAIN_SOURCE_RANGE} reliable, recent sources\n\
                     - Prefer authoritative sites: governmental, institutional, recognized press\n\
                     - Avoid search result pages, forums and social networks\n\
                     - Make sure each URL is complete and accessible\n\
                     \nEXAMPLE OF THE EXPECTED FORMAT:\n{CITATION_EXAMPLE}\n\
                     \nAnswer now, citing your sources with complete URLs."
                );
            }
            PromptKind::StructuredQuery => {
                push_question(&mut prompt, "For the following question", question, query);
                prompt.push_str(
                    "\nAnswer ONLY with a JSON object of this exact shape:\n\
                     {\n  \"answer\": \"your detailed answer\",\n  \"sources\": [\n    {\"name\": \"Site name\", \"url\": \"https://example.com/full-page\"}\n  ]\n}\n\
                     \nProvide one entry per source, prefer governmental, institutional and recognized press sites, \
                     and only include complete, accessible URLs.",
                );
            }
            PromptKind::FollowUpSources {
                already_harvested,
                target_minimum,
            } => {
                let requested = PromptKind::requested_additional(*already_harvested, *target_minimum);
                let _ = write!(
                    prompt,
                    "You already cited {already_harvested} sources for the question: \"{question}\"\n"
                );
                if let Some(context) = query.context() {
                    let _ = writeln!(prompt, "Context: {context}");
                }
                let _ = write!(
                    prompt,
                    "\nPlease provide {requested} ADDITIONAL high-quality sources on the same subject.\n\
                     \nSTRICT RULES:\n\
                     - Complete URLs only (https://...)\n\
                     - Sources must differ from the ones you already cited\n\
                     - Reliable, recognized sites in the field\n\
                     - Format: \"Source: [Site name] - URL: https://example.com/full-page\"\n\
                     \nEXAMPLE:\n{CITATION_EXAMPLE}\n"
                );
            }
            PromptKind::SourceVerification { response_body } => {
                let _ = write!(
                    prompt,
                    "Analyze the answer below, given for the question \"{question}\", and extract ONLY the URLs it already cites. \
                     Do not add new URLs.\n\
                     Return a JSON object with this exact shape:\n\
                     {{\n  \"urls\": [\n    {{\"url\": \"https://example.com/page\", \"source_name\": \"Source name\"}}\n  ]\n}}\n\
                     \nAnswer to analyze:\n{response_body}\n"
                );
            }
        }

        Ok(prompt)
    }
}

fn push_question(prompt: &mut String, lead: &str, question: &str, query: &ResearchQuery) {
    let _ = writeln!(prompt, "{lead}: \"{question}\"");
    if let Some(context) = query.context() {
        let _ = writeln!(prompt, "Context: {context}");
    }
}
