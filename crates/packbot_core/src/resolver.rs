use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::fuzzy::fuzzy_best;
use crate::knowledge::KnowledgeBase;
use crate::model::{round4, AnswerDecision, Candidate, Method};
use crate::normalize::normalize;
use crate::retrieval::{ScoredEntry, SimilarityBackend};

pub const TOP_K: usize = 3;
pub const CONF_THRESH: f32 = 0.50;
pub const LOWER_CONF_THRESH: f32 = 0.35;
pub const FUZZY_CUTOFF: f32 = 0.60;

pub const EMPTY_PROMPT: &str = "Please send a question.";
pub const SUGGESTIONS_REPLY: &str =
    "I found a few possibilities — please choose/rephrase if needed.";
pub const NOT_CONFIDENT_REPLY: &str =
    "Sorry, I don’t know the answer. Try rephrasing or pick from the suggestions.";

/// Answers chat messages against a fixed knowledge base.
///
/// Each message goes through, in order: the blank-input guard, the alias
/// shortcut, semantic search with confidence bands, and a fuzzy string
/// fallback. The first stage that produces an answer wins.
pub struct Resolver {
    kb: Arc<KnowledgeBase>,
    backend: Box<dyn SimilarityBackend>,
}

impl Resolver {
    pub fn new(kb: Arc<KnowledgeBase>, backend: Box<dyn SimilarityBackend>) -> Self {
        Self { kb, backend }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn resolve(&self, query: &str) -> Result<AnswerDecision> {
        if query.trim().is_empty() {
            return Ok(AnswerDecision {
                reply: EMPTY_PROMPT.to_string(),
                method: None,
                score: None,
                candidates: Vec::new(),
            });
        }

        let query_norm = normalize(query);

        if let Some(decision) = self.alias_shortcut(&query_norm) {
            return Ok(decision);
        }

        let hits = self
            .backend
            .rank(query, TOP_K)
            .context("semantic search failed")?;
        debug!(?hits, "semantic hits");

        let best = hits.first().copied();
        let best_score = best.map_or(0.0, |h| h.score);

        if let Some(best) = best {
            if best_score >= CONF_THRESH {
                return Ok(AnswerDecision {
                    reply: self.text(best.index)?,
                    method: Some(Method::Semantic),
                    score: Some(round4(best_score)),
                    candidates: Vec::new(),
                });
            }

            if best_score >= LOWER_CONF_THRESH {
                return Ok(AnswerDecision {
                    reply: SUGGESTIONS_REPLY.to_string(),
                    method: Some(Method::Suggestions),
                    score: None,
                    candidates: self.candidates(&hits)?,
                });
            }
        }

        let fuzzy = fuzzy_best(&query_norm, self.kb.normalized());
        debug!(?fuzzy, "fuzzy best");

        if let Some(m) = fuzzy.filter(|m| m.ratio >= FUZZY_CUTOFF) {
            return Ok(AnswerDecision {
                reply: self.text(m.index)?,
                method: Some(Method::Fuzzy),
                score: Some(round4(m.ratio)),
                candidates: Vec::new(),
            });
        }

        let mut candidates = self.candidates(&hits)?;
        if let Some(m) = fuzzy {
            candidates.push(Candidate {
                text: self.text(m.index)?,
                score: round4(m.ratio),
                method: Some(Method::Fuzzy),
            });
        }

        Ok(AnswerDecision {
            reply: NOT_CONFIDENT_REPLY.to_string(),
            method: Some(Method::NoneConfident),
            score: None,
            candidates,
        })
    }

    /// First query token that is a known alias wins.
    fn alias_shortcut(&self, query_norm: &str) -> Option<AnswerDecision> {
        let aliases = self.kb.aliases();
        query_norm.split_whitespace().find_map(|token| {
            let idx = aliases.get(token)?;
            let reply = self.kb.entry(idx)?.to_string();
            debug!(token, idx, "alias match");
            Some(AnswerDecision {
                reply,
                method: Some(Method::Alias),
                score: Some(1.0),
                candidates: Vec::new(),
            })
        })
    }

    fn text(&self, index: usize) -> Result<String> {
        self.kb
            .entry(index)
            .map(str::to_string)
            .with_context(|| format!("backend returned out-of-range entry {index}"))
    }

    fn candidates(&self, hits: &[ScoredEntry]) -> Result<Vec<Candidate>> {
        hits.iter()
            .map(|h| {
                Ok(Candidate {
                    text: self.text(h.index)?,
                    score: round4(h.score),
                    method: None,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tfidf::TfidfIndex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns canned hits and counts how often it is asked.
    struct FixedBackend {
        hits: Vec<ScoredEntry>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedBackend {
        fn scores(scores: &[f32]) -> Self {
            Self::hits(
                scores
                    .iter()
                    .enumerate()
                    .map(|(index, &score)| ScoredEntry { index, score })
                    .collect(),
            )
        }

        fn hits(hits: Vec<ScoredEntry>) -> Self {
            Self {
                hits,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SimilarityBackend for FixedBackend {
        fn rank(&self, _query: &str, k: usize) -> Result<Vec<ScoredEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.iter().copied().take(k).collect())
        }

        fn corpus_len(&self) -> usize {
            self.hits.len()
        }
    }

    struct FailingBackend;

    impl SimilarityBackend for FailingBackend {
        fn rank(&self, _query: &str, _k: usize) -> Result<Vec<ScoredEntry>> {
            anyhow::bail!("backend offline")
        }

        fn corpus_len(&self) -> usize {
            0
        }
    }

    fn kb() -> Arc<KnowledgeBase> {
        Arc::new(KnowledgeBase::packaging())
    }

    fn with_scores(scores: &[f32]) -> Resolver {
        Resolver::new(kb(), Box::new(FixedBackend::scores(scores)))
    }

    #[test]
    fn blank_input_returns_prompt() {
        let resolver = Resolver::new(kb(), Box::new(FailingBackend));
        for q in ["", "   ", "\t\n"] {
            let d = resolver.resolve(q).unwrap();
            assert_eq!(d.reply, EMPTY_PROMPT);
            assert_eq!(d.method, None);
            assert_eq!(d.score, None);
            assert!(d.candidates.is_empty());
        }
    }

    #[test]
    fn alias_shortcut_answers_acronyms() {
        let resolver = Resolver::new(kb(), Box::new(FailingBackend));
        let d = resolver.resolve("What is PLA?").unwrap();
        assert_eq!(d.method, Some(Method::Alias));
        assert_eq!(d.score, Some(1.0));
        assert!(d.reply.contains("Polylactic"));
    }

    #[test]
    fn first_alias_token_wins() {
        let resolver = Resolver::new(kb(), Box::new(FailingBackend));
        let d = resolver.resolve("compare pet with pp").unwrap();
        assert!(d.reply.contains("terephthalate"));

        let d = resolver.resolve("compare pp with pet").unwrap();
        assert!(d.reply.contains("Polypropylene"));
    }

    #[test]
    fn alias_hit_skips_semantic_search() {
        let backend = FixedBackend::scores(&[0.9]);
        let calls = Arc::clone(&backend.calls);
        let resolver = Resolver::new(kb(), Box::new(backend));

        resolver.resolve("tell me about chitosan").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        resolver.resolve("tell me about seaweed").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn confident_semantic_match() {
        let resolver = with_scores(&[0.8, 0.3, 0.2]);
        let d = resolver.resolve("which material is a large molecule").unwrap();
        assert_eq!(d.method, Some(Method::Semantic));
        assert_eq!(d.score, Some(0.8));
        assert_eq!(d.reply, resolver.knowledge().corpus()[0]);
        assert!(d.candidates.is_empty());
    }

    #[test]
    fn moderate_score_returns_suggestions() {
        let resolver = with_scores(&[0.40, 0.38, 0.30]);
        let d = resolver.resolve("something vaguely related").unwrap();
        assert_eq!(d.method, Some(Method::Suggestions));
        assert_eq!(d.reply, SUGGESTIONS_REPLY);
        assert_eq!(d.score, None);
        assert_eq!(d.candidates.len(), 3);
        assert_eq!(d.candidates[0].score, 0.4);
        assert!(d.candidates.iter().all(|c| c.method.is_none()));
    }

    #[test]
    fn band_edges_are_inclusive() {
        let d = with_scores(&[0.50]).resolve("zzz qqq").unwrap();
        assert_eq!(d.method, Some(Method::Semantic));
        let d = with_scores(&[0.35]).resolve("zzz qqq").unwrap();
        assert_eq!(d.method, Some(Method::Suggestions));
    }

    #[test]
    fn low_score_falls_back_to_fuzzy() {
        let resolver = with_scores(&[0.10, 0.05, 0.01]);
        let d = resolver
            .resolve("Migration is the movment of additive into food")
            .unwrap();
        assert_eq!(d.method, Some(Method::Fuzzy));
        assert_eq!(d.reply, "Migration is the movement of additives into food.");
        assert!(d.score.unwrap() >= FUZZY_CUTOFF);
    }

    #[test]
    fn nothing_confident_lists_all_candidates() {
        let resolver = with_scores(&[0.10, 0.05, 0.01]);
        let d = resolver.resolve("xylophone quartet").unwrap();
        assert_eq!(d.method, Some(Method::NoneConfident));
        assert_eq!(d.reply, NOT_CONFIDENT_REPLY);
        assert_eq!(d.candidates.len(), 4);
        assert_eq!(d.candidates[0].score, 0.1);
        let last = d.candidates.last().unwrap();
        assert_eq!(last.method, Some(Method::Fuzzy));
        assert!(last.score < FUZZY_CUTOFF);
    }

    #[test]
    fn empty_ranking_still_reaches_fuzzy() {
        let resolver = with_scores(&[]);
        let d = resolver.resolve("xylophone quartet").unwrap();
        assert_eq!(d.method, Some(Method::NoneConfident));
        assert_eq!(d.candidates.len(), 1);
    }

    #[test]
    fn backend_failure_is_an_error() {
        let resolver = Resolver::new(kb(), Box::new(FailingBackend));
        let err = resolver.resolve("how do barrier films work").unwrap_err();
        assert!(format!("{err:#}").contains("backend offline"));
    }

    #[test]
    fn out_of_range_backend_index_is_an_error() {
        let backend = FixedBackend::hits(vec![ScoredEntry {
            index: 500,
            score: 0.9,
        }]);
        let resolver = Resolver::new(kb(), Box::new(backend));
        let err = resolver.resolve("how do barrier films work").unwrap_err();
        assert!(err.to_string().contains("out-of-range entry 500"));
    }

    #[test]
    fn punctuation_only_query_has_no_fuzzy_suggestion() {
        let kb = kb();
        let backend = TfidfIndex::fit(kb.corpus());
        let resolver = Resolver::new(kb, Box::new(backend));

        let d = resolver.resolve("???").unwrap();
        assert_eq!(d.method, Some(Method::NoneConfident));
        assert_eq!(d.candidates.len(), TOP_K);
        assert!(d.candidates.iter().all(|c| c.method.is_none()));
        assert!(d
            .candidates
            .iter()
            .all(|c| c.score == 0.0 && c.score.is_sign_positive()));

        let json = serde_json::to_string(&d).unwrap();
        assert!(!json.contains("-0"), "{json}");
    }

    #[test]
    fn works_end_to_end_with_tfidf() {
        let kb = kb();
        let backend = TfidfIndex::fit(kb.corpus());
        let resolver = Resolver::new(kb, Box::new(backend));

        let d = resolver
            .resolve("Intelligent packaging monitors food quality with sensors")
            .unwrap();
        assert_eq!(d.method, Some(Method::Semantic));
        assert!(d.reply.starts_with("Intelligent packaging"));
    }
}
