use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use ragrank_core::traits::{CompletionModel, Expansion, QueryExpander};

const INTENT_PREFIX: &str = "INTENTION:";

/// Query expansion by prompting a completion model for an intent label and
/// numbered alternative phrasings.
pub struct GenerativeExpander {
    model: Arc<dyn CompletionModel>,
}

impl GenerativeExpander {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self { Self { model } }

    pub fn prompt(query: &str, max_expansions: usize) -> String {
        format!(
            "You are expanding a search query for a document retrieval system.\n\
             Query: \"{query}\"\n\n\
             1. Identify the search intent (information, comparison, procedure, ...).\n\
             2. Write {max_expansions} alternative queries covering different aspects of the question.\n\
             3. Use synonyms, rephrasings, technical and plain-language terms.\n\n\
             Answer format:\n\
             {INTENT_PREFIX} <intent>\n\
             QUERIES:\n\
             1. <alternative query>\n"
        )
    }
}

impl QueryExpander for GenerativeExpander {
    fn expand(&self, query: &str, max_expansions: usize) -> Result<Expansion> {
        if max_expansions == 0 {
            return Ok(Expansion::default());
        }
        let answer = self.model.complete(&Self::prompt(query, max_expansions))?;
        let expansion = parse_expansion(&answer, max_expansions);
        debug!(variants = expansion.variants.len(), intent = ?expansion.intent, "query expanded");
        Ok(expansion)
    }
}

/// Reads an `INTENTION:` line and numbered (`1.`, `2)`) or dashed lines out
/// of a model answer. Other lines are ignored.
pub fn parse_expansion(answer: &str, max_expansions: usize) -> Expansion {
    let mut out = Expansion::default();
    for line in answer.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(INTENT_PREFIX) {
            let intent = rest.trim();
            if !intent.is_empty() {
                out.intent = Some(intent.to_string());
            }
            continue;
        }
        let Some(first) = line.chars().next() else { continue };
        let text = if first.is_ascii_digit() {
            line.trim_start_matches(|c: char| c.is_ascii_digit()).trim_start_matches(['.', ')', ':'])
        } else if first == '-' || first == '*' {
            &line[1..]
        } else {
            continue;
        };
        let text = text.trim().trim_matches('"').trim();
        if !text.is_empty() && out.variants.len() < max_expansions {
            out.variants.push(text.to_string());
        }
    }
    out
}

/// The variant list a request retrieves with: the original query first,
/// then expansions, case-insensitively deduplicated and capped at
/// `max_variants` (never below 1).
pub fn build_variants(original: &str, expansion: &Expansion, max_variants: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut variants = Vec::with_capacity(max_variants.max(1));
    for v in std::iter::once(original).chain(expansion.variants.iter().map(String::as_str)) {
        let v = v.trim();
        if v.is_empty() || !seen.insert(v.to_lowercase()) {
            continue;
        }
        variants.push(v.to_string());
        if variants.len() >= max_variants.max(1) {
            break;
        }
    }
    variants
}
