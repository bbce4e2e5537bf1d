//! Translation of [`QueryClause`] trees into tantivy queries.

use std::collections::{BTreeMap, HashMap, HashSet};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, DisjunctionMaxQuery, EmptyQuery, Occur,
    Query, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::{Searcher, Term};

use super::EmbeddedIndex;
use crate::search::error::{Result, SearchError};
use crate::search::request::{MultiMatch, Operator, QueryClause};
use crate::search::schema::FieldType;

/// Upper bound on the terms one fuzzy token expands to.
const MAX_EXPANSIONS: usize = 50;

pub(super) struct CompiledQuery {
    pub(super) query: Box<dyn Query>,
    pub(super) terms: HighlightTerms,
}

/// Indexed terms a query can match, per field.
#[derive(Debug, Default)]
pub(super) struct HighlightTerms {
    by_field: HashMap<String, HashSet<String>>,
}

impl HighlightTerms {
    fn add(&mut self, field: &str, term: &str) {
        self.by_field
            .entry(field.to_string())
            .or_default()
            .insert(term.to_string());
    }

    /// Terms to mark in `field`. Without `require_field_match` a term matched
    /// in any field is marked everywhere.
    pub(super) fn matching(&self, field: &str, require_field_match: bool) -> HashSet<&str> {
        if require_field_match {
            self.by_field
                .get(field)
                .map(|terms| terms.iter().map(String::as_str).collect())
                .unwrap_or_default()
        } else {
            self.by_field
                .values()
                .flat_map(|terms| terms.iter().map(String::as_str))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fuzziness {
    Auto,
    Fixed(usize),
}

impl Fuzziness {
    fn parse(raw: Option<&str>) -> Result<Self> {
        match raw {
            None => Ok(Fuzziness::Fixed(0)),
            Some(raw) if raw.eq_ignore_ascii_case("auto") => Ok(Fuzziness::Auto),
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|edits| *edits <= 2)
                .map(Fuzziness::Fixed)
                .ok_or_else(|| {
                    SearchError::bad_request(
                        "parsing_exception",
                        format!("invalid fuzziness [{raw}]"),
                    )
                }),
        }
    }

    /// Edits allowed for a term of `len` characters.
    fn edits(self, len: usize) -> usize {
        match self {
            Fuzziness::Auto => match len {
                0..=2 => 0,
                3..=5 => 1,
                _ => 2,
            },
            Fuzziness::Fixed(edits) => edits,
        }
    }
}

/// Split `name^boost` into its parts.
fn parse_field_spec(spec: &str) -> Result<(&str, f32)> {
    match spec.split_once('^') {
        None => Ok((spec, 1.0)),
        Some((name, boost)) => boost
            .parse::<f32>()
            .map(|boost| (name, boost))
            .map_err(|_| {
                SearchError::bad_request("parsing_exception", format!("invalid field boost [{spec}]"))
            }),
    }
}

/// Optimal string alignment distance: Levenshtein plus adjacent swaps.
pub(super) fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for (j, cell) in d[0].iter_mut().enumerate() {
        *cell = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j] + 1).min(d[i][j - 1] + 1).min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }
    d[a.len()][b.len()]
}

pub(super) fn compile(
    clause: &QueryClause,
    index: &EmbeddedIndex,
    searcher: &Searcher,
) -> Result<CompiledQuery> {
    let mut compiler = Compiler {
        index,
        searcher,
        terms: HighlightTerms::default(),
    };
    let query = compiler.clause(clause, true)?;
    Ok(CompiledQuery {
        query,
        terms: compiler.terms,
    })
}

struct Compiler<'a> {
    index: &'a EmbeddedIndex,
    searcher: &'a Searcher,
    terms: HighlightTerms,
}

impl Compiler<'_> {
    /// `scoring` is false inside filters, whose terms are not highlighted.
    fn clause(&mut self, clause: &QueryClause, scoring: bool) -> Result<Box<dyn Query>> {
        match clause {
            QueryClause::MatchAll(_) => Ok(Box::new(AllQuery)),
            QueryClause::Bool(bool_query) => {
                if bool_query.must.is_empty() && bool_query.filter.is_empty() {
                    return Ok(Box::new(AllQuery));
                }
                let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
                for must in &bool_query.must {
                    clauses.push((Occur::Must, self.clause(must, scoring)?));
                }
                for filter in &bool_query.filter {
                    let inner = self.clause(filter, false)?;
                    clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(inner, 0.0))));
                }
                Ok(Box::new(BooleanQuery::new(clauses)))
            }
            QueryClause::Terms(by_field) => self.terms_query(by_field),
            QueryClause::MultiMatch(multi_match) => self.multi_match(multi_match, scoring),
        }
    }

    fn terms_query(&self, by_field: &BTreeMap<String, Vec<String>>) -> Result<Box<dyn Query>> {
        let mut entries = by_field.iter();
        let (name, values) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(SearchError::bad_request(
                    "parsing_exception",
                    "[terms] query requires exactly one field",
                ))
            }
        };

        let Some((field, _)) = self.index.schema.field(name) else {
            return Ok(Box::new(EmptyQuery));
        };
        let clauses: Vec<(Occur, Box<dyn Query>)> = values
            .iter()
            .map(|value| {
                let term = Term::from_field_text(field, value);
                let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                (Occur::Should, query)
            })
            .collect();
        if clauses.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// `best_fields`: each field is scored on its own and the best one wins.
    fn multi_match(&mut self, multi_match: &MultiMatch, scoring: bool) -> Result<Box<dyn Query>> {
        let fuzziness = Fuzziness::parse(multi_match.fuzziness.as_deref())?;
        let occur = match multi_match.operator {
            Operator::Or => Occur::Should,
            Operator::And => Occur::Must,
        };

        let mut per_field: Vec<Box<dyn Query>> = Vec::new();
        for spec in &multi_match.fields {
            let (name, boost) = parse_field_spec(spec)?;
            let Some((field, kind)) = self.index.schema.field(name) else {
                continue;
            };
            let tokens = match kind {
                FieldType::Text => self.analyze(field, &multi_match.query)?,
                FieldType::Keyword => vec![multi_match.query.clone()],
                FieldType::Date => continue,
            };
            if tokens.is_empty() {
                continue;
            }

            let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(tokens.len());
            for token in &tokens {
                let query = self.token_query(field, name, token, fuzziness, multi_match.prefix_length, scoring)?;
                clauses.push((occur, query));
            }
            per_field.push(Box::new(BoostQuery::new(Box::new(BooleanQuery::new(clauses)), boost)));
        }

        if per_field.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(Box::new(DisjunctionMaxQuery::new(per_field)))
    }

    fn analyze(&self, field: Field, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self.index.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while stream.advance() {
            tokens.push(stream.token().text.clone());
        }
        Ok(tokens)
    }

    fn token_query(
        &mut self,
        field: Field,
        name: &str,
        token: &str,
        fuzziness: Fuzziness,
        prefix_length: usize,
        scoring: bool,
    ) -> Result<Box<dyn Query>> {
        let edits = fuzziness.edits(token.chars().count());
        if edits == 0 {
            if scoring {
                self.terms.add(name, token);
            }
            let term = Term::from_field_text(field, token);
            return Ok(Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)));
        }

        let expansions = self.expand(field, token, edits, prefix_length)?;
        if expansions.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        let clauses: Vec<(Occur, Box<dyn Query>)> = expansions
            .into_iter()
            .map(|candidate| {
                if scoring {
                    self.terms.add(name, &candidate);
                }
                let term = Term::from_field_text(field, &candidate);
                let query: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
                (Occur::Should, query)
            })
            .collect();
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Indexed terms within `edits` of `token` that share its first
    /// `prefix_length` characters, closest first.
    fn expand(&self, field: Field, token: &str, edits: usize, prefix_length: usize) -> Result<Vec<String>> {
        let prefix: String = token.chars().take(prefix_length).collect();
        let token_len = token.chars().count();
        let mut found: BTreeMap<String, usize> = BTreeMap::new();

        for segment in self.searcher.segment_readers() {
            let inverted_index = segment.inverted_index(field)?;
            let mut stream = inverted_index
                .terms()
                .range()
                .ge(prefix.as_bytes())
                .into_stream()?;
            while stream.advance() {
                let key = stream.key();
                if !key.starts_with(prefix.as_bytes()) {
                    break;
                }
                let Ok(candidate) = std::str::from_utf8(key) else {
                    continue;
                };
                if candidate.chars().count().abs_diff(token_len) > edits {
                    continue;
                }
                let distance = edit_distance(token, candidate);
                if distance <= edits {
                    found.insert(candidate.to_string(), distance);
                }
            }
        }

        let mut ranked: Vec<(usize, String)> = found.into_iter().map(|(term, d)| (d, term)).collect();
        ranked.sort();
        Ok(ranked
            .into_iter()
            .take(MAX_EXPANSIONS)
            .map(|(_, term)| term)
            .collect())
    }
}
