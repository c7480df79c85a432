//! Deterministic prompt assembly.
//!
//! Identical inputs produce byte-identical prompts: block kinds are listed in
//! registry order and free-form hints iterate in key order.

use std::fmt::Write as _;

use crate::model::{GenerationRequest, StyleHints, TaskKind};
use crate::schema::{SchemaComposer, SlideBounds};
use crate::transport::Conformance;

/// System and user messages for one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// What went wrong with the first attempt, which decides the wording of the
/// repair instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairCause {
    /// A response arrived but was not JSON matching the schema.
    InvalidResponse,
    /// The provider call failed before any usable response arrived.
    ProviderFailure,
}

impl Prompt {
    /// Copy of this prompt with the repair instruction appended to the system
    /// message. `diagnostic` describes what was wrong with the first attempt.
    pub fn with_repair_notice(&self, cause: RepairCause, diagnostic: &str) -> Prompt {
        let mut system = self.system.clone();
        system.push_str(match cause {
            RepairCause::InvalidResponse => {
                "\n\nIMPORTANT: the previous response was not valid JSON matching the schema. \
                 Return only valid JSON that matches the schema, with no commentary and no code fences."
            }
            RepairCause::ProviderFailure => {
                "\n\nIMPORTANT: Return only valid JSON that matches the schema, with no commentary and no code fences."
            }
        });
        if cause == RepairCause::InvalidResponse && !diagnostic.trim().is_empty() {
            let _ = write!(system, "\nProblem with the previous response: {}", diagnostic.trim());
        }
        Prompt {
            system,
            user: self.user.clone(),
        }
    }
}

const MARKER_GRAMMAR: &str = "Inline emphasis inside paragraph text uses exactly three markers, never nested and never spanning lines: \
*text* renders gold (key terms), ~text~ renders red (warnings, adverse findings), _text_ renders blue (statutes, citations).";

pub struct PromptAssembler<'a> {
    composer: &'a SchemaComposer,
}

impl<'a> PromptAssembler<'a> {
    pub fn new(composer: &'a SchemaComposer) -> Self {
        Self { composer }
    }

    pub fn assemble(&self, request: &GenerationRequest, conformance: Conformance) -> Prompt {
        let (mut system, user) = match request.kind {
            TaskKind::Deck => (self.deck_system(), deck_user(&request.input, &request.hints)),
            TaskKind::Citations => (citations_system(), citations_user(&request.input, &request.hints)),
            TaskKind::CitationDetail => (detail_system(), detail_user(&request.input, &request.hints)),
        };

        // free-text providers never see the schema otherwise
        if conformance == Conformance::FreeText {
            let schema = match request.kind {
                TaskKind::Deck => self.composer.deck_schema(),
                TaskKind::Citations => self.composer.citation_result_schema(),
                TaskKind::CitationDetail => self.composer.citation_schema(),
            };
            let _ = write!(
                system,
                "\n\nThe response must validate against this JSON Schema:\n{}",
                schema.document()
            );
        }

        Prompt { system, user }
    }

    fn deck_system(&self) -> String {
        let registry = self.composer.registry();
        let bounds = SlideBounds::GENERATED;
        let mut out = String::new();
        out.push_str(
            "You are a legal presentation designer. Turn the user's legal material into a slide deck.\n\n",
        );
        out.push_str("Output contract:\n");
        out.push_str("- Respond with a single JSON object matching the Deck schema: { title, totalSlides, slides }.\n");
        let _ = writeln!(
            out,
            "- The deck has between {} and {} slides; totalSlides equals the number of slides.",
            bounds.min.unwrap_or(1),
            bounds.max.unwrap_or(usize::MAX)
        );
        out.push_str("- Every slide has a non-empty title, a subtitle (empty string allowed) and a list of blocks.\n");
        out.push_str("- Each block is { id, type, data }. Leave id as an empty string; ids are assigned later.\n");
        out.push_str("- When a slide would benefit from imagery, list short image search phrases in suggestedImages instead of emitting image blocks.\n");
        out.push_str("- Optional fields are still present: use empty strings, false or empty lists when they do not apply.\n\n");
        out.push_str("Allowed block types:\n");
        for kind in registry.kinds() {
            let _ = writeln!(out, "- {}: {}", kind.tag(), registry.describe(kind));
        }
        out.push('\n');
        out.push_str(MARKER_GRAMMAR);
        out
    }
}

fn push_hints(out: &mut String, hints: &StyleHints, slide_count: bool) {
    if let Some(tone) = hints.tone.as_deref().filter(|t| !t.trim().is_empty()) {
        let _ = writeln!(out, "Tone: {}", tone.trim());
    }
    if let Some(jurisdiction) = hints.jurisdiction.as_deref().filter(|j| !j.trim().is_empty()) {
        let _ = writeln!(out, "Jurisdiction: {}", jurisdiction.trim());
    }
    if slide_count {
        if let Some(count) = hints.target_slide_count {
            let _ = writeln!(
                out,
                "Target slide count: {}",
                SlideBounds::GENERATED.clamp(count)
            );
        }
    }
    for (key, value) in &hints.extra {
        let _ = writeln!(out, "{key}: {value}");
    }
}

fn deck_user(input: &str, hints: &StyleHints) -> String {
    let mut out = String::new();
    out.push_str("Source material:\n");
    out.push_str(input);
    out.push('\n');
    let mut style = String::new();
    push_hints(&mut style, hints, true);
    if !style.is_empty() {
        out.push_str("\nStyle:\n");
        out.push_str(&style);
    }
    out
}

fn citations_system() -> String {
    let mut out = String::new();
    out.push_str("You are a legal research assistant. Find legal authorities relevant to the user's query.\n\n");
    out.push_str("Output contract:\n");
    out.push_str("- Respond with a single JSON object matching the CitationResult schema: { query, citations, totalFound, searchTime }.\n");
    out.push_str("- Each citation is { type, name, year, fullTitle, summary, relevance, url } with type one of article, case, act, section.\n");
    out.push_str("- relevance is a number from 0 to 100; order citations from most to least relevant.\n");
    out.push_str("- Cases carry their decision year; use an empty string for year when it does not apply.\n");
    out.push_str("- Never invent URLs. Use an empty string for url unless you are certain of the official source.\n");
    out.push_str("- totalFound is at least the number of citations returned.");
    out
}

fn citations_user(query: &str, hints: &StyleHints) -> String {
    let mut out = format!("Query: {query}\n");
    push_hints(&mut out, hints, false);
    out
}

fn detail_system() -> String {
    let mut out = String::new();
    out.push_str("You are a legal research assistant. Explain the single legal authority the user names.\n\n");
    out.push_str("Output contract:\n");
    out.push_str("- Respond with a single JSON object matching the Citation schema: { type, name, year, fullTitle, summary, relevance, url }.\n");
    out.push_str("- summary is an expanded explanation: holding or provision, context, and present-day significance.\n");
    out.push_str("- relevance is a number from 0 to 100 describing how authoritative the source is today.\n");
    out.push_str("- Never invent URLs. Use an empty string for url unless you are certain of the official source.");
    out
}

fn detail_user(name: &str, hints: &StyleHints) -> String {
    let mut out = format!("Citation: {name}\n");
    push_hints(&mut out, hints, false);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;

    fn composer() -> SchemaComposer {
        SchemaComposer::default()
    }

    #[test]
    fn deck_prompt_is_deterministic() {
        let composer = composer();
        let assembler = PromptAssembler::new(&composer);
        let mut hints = StyleHints {
            tone: Some("formal".into()),
            jurisdiction: Some("India".into()),
            target_slide_count: Some(5),
            ..Default::default()
        };
        hints.extra.insert("audience".into(), "law students".into());
        hints.extra.insert("accent".into(), "gold".into());
        let request = GenerationRequest::new(TaskKind::Deck, "Summarise Puttaswamy.").with_hints(hints);

        let a = assembler.assemble(&request, Conformance::Strict);
        let b = assembler.assemble(&request, Conformance::Strict);
        assert_eq!(a, b);
        assert!(a.user.find("accent").unwrap() < a.user.find("audience").unwrap());
    }

    #[test]
    fn deck_system_lists_every_kind_and_rules() {
        let composer = composer();
        let assembler = PromptAssembler::new(&composer);
        let prompt = assembler.assemble(
            &GenerationRequest::new(TaskKind::Deck, "x"),
            Conformance::Strict,
        );
        for kind in BlockKind::ALL {
            assert!(prompt.system.contains(&format!("- {}: ", kind.tag())));
        }
        assert!(prompt.system.contains("between 3 and 8 slides"));
        assert!(prompt.system.contains("*text*"));
        assert!(prompt.system.contains("~text~"));
        assert!(prompt.system.contains("_text_"));
        assert!(!prompt.system.contains("JSON Schema:"));
    }

    #[test]
    fn user_message_embeds_input_verbatim_and_clamps_count() {
        let composer = composer();
        let assembler = PromptAssembler::new(&composer);
        let input = "Summarise Puttaswamy v. Union of India for a 5-slide deck.\n  (keep spacing)";
        let request = GenerationRequest::new(TaskKind::Deck, input).with_hints(StyleHints {
            target_slide_count: Some(40),
            ..Default::default()
        });
        let prompt = assembler.assemble(&request, Conformance::Strict);
        assert!(prompt.user.contains(input));
        assert!(prompt.user.contains("Target slide count: 8"));
    }

    #[test]
    fn free_text_embeds_schema() {
        let composer = composer();
        let assembler = PromptAssembler::new(&composer);
        let prompt = assembler.assemble(
            &GenerationRequest::new(TaskKind::Citations, "privacy"),
            Conformance::FreeText,
        );
        assert!(prompt.system.contains("JSON Schema:"));
        assert!(prompt.system.contains("\"totalFound\""));
    }

    #[test]
    fn citation_prompts_forbid_invented_urls() {
        let composer = composer();
        let assembler = PromptAssembler::new(&composer);
        for kind in [TaskKind::Citations, TaskKind::CitationDetail] {
            let prompt = assembler.assemble(&GenerationRequest::new(kind, "Article 21"), Conformance::Strict);
            assert!(prompt.system.contains("Never invent URLs"));
            assert!(prompt.system.contains("0 to 100"));
        }
    }

    #[test]
    fn repair_notice_keeps_user_message() {
        let prompt = Prompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        let repaired =
            prompt.with_repair_notice(RepairCause::InvalidResponse, "expected value at line 1 column 12");
        assert_eq!(repaired.user, "usr");
        assert!(repaired.system.starts_with("sys"));
        assert!(repaired.system.contains("previous response was not valid JSON"));
        assert!(repaired.system.contains("line 1 column 12"));
    }

    #[test]
    fn repair_after_provider_failure_does_not_blame_a_response() {
        let prompt = Prompt {
            system: "sys".into(),
            user: "usr".into(),
        };
        let repaired =
            prompt.with_repair_notice(RepairCause::ProviderFailure, "network error: connection reset");
        assert!(!repaired.system.contains("previous response"));
        assert!(!repaired.system.contains("connection reset"));
        assert!(repaired.system.contains("Return only valid JSON"));
    }
}
