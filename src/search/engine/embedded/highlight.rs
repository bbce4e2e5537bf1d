//! Query-term highlighting over stored field text.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use super::translate::HighlightTerms;
use super::EmbeddedIndex;
use crate::search::error::Result;
use crate::search::request::{Highlight, HighlightField};
use crate::search::schema::FieldType;

const DEFAULT_PRE_TAG: &str = "<em>";
const DEFAULT_POST_TAG: &str = "</em>";

/// Fragments for every requested text field of one hit. `None` when nothing
/// matched.
pub(super) fn highlight_hit(
    index: &EmbeddedIndex,
    source: &Map<String, Value>,
    request: &Highlight,
    terms: &HighlightTerms,
) -> Result<Option<HashMap<String, Vec<String>>>> {
    let mut highlights = HashMap::new();

    for (name, options) in &request.fields {
        let Some((field, FieldType::Text)) = index.schema.field(name) else {
            continue;
        };
        let wanted = terms.matching(name, request.require_field_match);
        if wanted.is_empty() {
            continue;
        }
        let texts: Vec<&str> = match source.get(name) {
            Some(Value::String(text)) => vec![text.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => continue,
        };

        let mut analyzer = index.index.tokenizer_for_field(field)?;
        let mut fragments = Vec::new();
        for text in texts {
            fragments.extend(highlight_text(text, &mut analyzer, &wanted, options));
        }
        if options.number_of_fragments > 0 {
            fragments.truncate(options.number_of_fragments);
        }
        if !fragments.is_empty() {
            highlights.insert(name.clone(), fragments);
        }
    }

    Ok((!highlights.is_empty()).then_some(highlights))
}

fn highlight_text(
    text: &str,
    analyzer: &mut TextAnalyzer,
    wanted: &HashSet<&str>,
    options: &HighlightField,
) -> Vec<String> {
    let mut spans = Vec::new();
    let mut stream = analyzer.token_stream(text);
    while stream.advance() {
        let token = stream.token();
        if wanted.contains(token.text.as_str()) {
            spans.push(token.offset_from..token.offset_to);
        }
    }
    if spans.is_empty() {
        return Vec::new();
    }

    let pre = first_tag(&options.pre_tags, DEFAULT_PRE_TAG);
    let post = first_tag(&options.post_tags, DEFAULT_POST_TAG);

    if options.number_of_fragments == 0 {
        return vec![mark(text, 0..text.len(), &spans, pre, post)];
    }

    let size = options.fragment_size.max(1);
    let mut fragments = Vec::new();
    let mut i = 0;
    while i < spans.len() && fragments.len() < options.number_of_fragments {
        let start = spans[i].start;
        let mut end = text[start..]
            .char_indices()
            .nth(size)
            .map_or(text.len(), |(offset, _)| start + offset);
        if end < text.len() {
            // Break on whitespace rather than mid-word.
            if let Some(ws) = text[start..end].rfind(char::is_whitespace) {
                if start + ws >= spans[i].end {
                    end = start + ws;
                }
            }
        }
        end = end.max(spans[i].end);

        let mut j = i;
        while j < spans.len() && spans[j].end <= end {
            j += 1;
        }
        fragments.push(mark(text, start..end, &spans[i..j], pre, post));
        i = j;
    }
    fragments
}

fn first_tag<'a>(tags: &'a Option<Vec<String>>, default: &'a str) -> &'a str {
    tags.as_ref()
        .and_then(|tags| tags.first())
        .map(String::as_str)
        .unwrap_or(default)
}

/// Copy `window` of `text`, wrapping each span that lies inside it in tags.
fn mark(text: &str, window: Range<usize>, spans: &[Range<usize>], pre: &str, post: &str) -> String {
    let mut out = String::with_capacity(window.len() + spans.len() * (pre.len() + post.len()));
    let mut cursor = window.start;
    for span in spans {
        if span.start < cursor || span.end > window.end {
            continue;
        }
        out.push_str(&text[cursor..span.start]);
        out.push_str(pre);
        out.push_str(&text[span.clone()]);
        out.push_str(post);
        cursor = span.end;
    }
    out.push_str(&text[cursor..window.end]);
    out
}
