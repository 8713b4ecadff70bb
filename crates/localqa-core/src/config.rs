use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// BM25 saturation and length-normalization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Weights of the chunk scoring formula.
///
/// `final = semantic·s + lexical_overlap·o + tag·t + title·ti + doc_type·d
///        + exact_token·e + phrase·p + numeric·n + anchor ± + acronym + session`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Share of normalized BM25 inside the semantic score.
    pub bm25_blend: f32,
    /// Share of trigram Jaccard inside the semantic score.
    pub trigram_blend: f32,
    pub semantic: f32,
    pub lexical_overlap: f32,
    pub tag: f32,
    pub title: f32,
    pub doc_type: f32,
    pub exact_token: f32,
    pub phrase: f32,
    pub numeric: f32,
    pub anchor_bonus: f32,
    pub anchor_penalty: f32,
    pub short_acronym_bonus: f32,
    pub session_bias: f32,
    /// Numeric sub-score granted to number-bearing chunks when the question
    /// asks for a quantity but names no number itself.
    pub numeric_intent_credit: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            bm25_blend: 0.65,
            trigram_blend: 0.35,
            semantic: 0.9,
            lexical_overlap: 0.25,
            tag: 0.15,
            title: 0.2,
            doc_type: 0.1,
            exact_token: 0.9,
            phrase: 0.8,
            numeric: 1.6,
            anchor_bonus: 0.35,
            anchor_penalty: 0.5,
            short_acronym_bonus: 0.15,
            session_bias: 0.2,
            numeric_intent_credit: 0.35,
        }
    }
}

/// Thresholds of the adaptive "is there an answer at all" decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub absolute_floor: f32,
    pub median_margin: f32,
    pub gap_threshold: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { absolute_floor: 1.0, median_margin: 0.35, gap_threshold: 0.2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub per_document_cap: usize,
    pub pool_cap: usize,
    pub top_k: usize,
    pub count_digit_bonus: f32,
    pub count_numeric_multiplier: f32,
    pub subject_bonus: f32,
    pub keyword_weight: f32,
    pub min_keyword_overlap: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            per_document_cap: 10,
            pool_cap: 80,
            top_k: 12,
            count_digit_bonus: 0.3,
            count_numeric_multiplier: 1.5,
            subject_bonus: 0.35,
            keyword_weight: 0.3,
            min_keyword_overlap: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub max_hits: usize,
    /// Fraction of the parent hit's score carried by a pulled-in neighbor.
    pub neighbor_score_factor: f32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self { max_hits: 18, neighbor_score_factor: 0.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub top_documents: usize,
    pub summary_chars: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { top_documents: 6, summary_chars: 400 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub total_chars: usize,
    pub first_share: f32,
    pub second_share: f32,
    /// Weight of rank shares against score shares.
    pub rank_blend: f32,
    pub min_reserve: usize,
    pub fallback_summary_chars: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total_chars: 4000,
            first_share: 0.45,
            second_share: 0.25,
            rank_blend: 0.7,
            min_reserve: 120,
            fallback_summary_chars: 600,
        }
    }
}

/// Every tunable of the retrieval engine in one auditable place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub bm25: Bm25Params,
    pub weights: ScoringWeights,
    pub gate: GateConfig,
    pub rerank: RerankConfig,
    pub expansion: ExpansionConfig,
    pub fallback: FallbackConfig,
    pub budget: BudgetConfig,
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        let w = &self.weights;
        let named = [
            ("bm25.k1", self.bm25.k1),
            ("bm25.b", self.bm25.b),
            ("weights.bm25_blend", w.bm25_blend),
            ("weights.trigram_blend", w.trigram_blend),
            ("weights.semantic", w.semantic),
            ("weights.lexical_overlap", w.lexical_overlap),
            ("weights.tag", w.tag),
            ("weights.title", w.title),
            ("weights.doc_type", w.doc_type),
            ("weights.exact_token", w.exact_token),
            ("weights.phrase", w.phrase),
            ("weights.numeric", w.numeric),
            ("weights.anchor_bonus", w.anchor_bonus),
            ("weights.anchor_penalty", w.anchor_penalty),
            ("weights.short_acronym_bonus", w.short_acronym_bonus),
            ("weights.session_bias", w.session_bias),
            ("weights.numeric_intent_credit", w.numeric_intent_credit),
            ("gate.absolute_floor", self.gate.absolute_floor),
            ("gate.median_margin", self.gate.median_margin),
            ("gate.gap_threshold", self.gate.gap_threshold),
            ("rerank.count_digit_bonus", self.rerank.count_digit_bonus),
            ("rerank.count_numeric_multiplier", self.rerank.count_numeric_multiplier),
            ("rerank.subject_bonus", self.rerank.subject_bonus),
            ("rerank.keyword_weight", self.rerank.keyword_weight),
            ("expansion.neighbor_score_factor", self.expansion.neighbor_score_factor),
            ("budget.first_share", self.budget.first_share),
            ("budget.second_share", self.budget.second_share),
            ("budget.rank_blend", self.budget.rank_blend),
        ];
        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.bm25.b > 1.0 {
            let b = self.bm25.b;
            return Err(Error::InvalidConfig(format!("bm25.b must be within [0, 1], got {b}")));
        }
        if self.budget.rank_blend > 1.0 {
            return Err(Error::InvalidConfig(format!(
                "budget.rank_blend must be within [0, 1], got {}",
                self.budget.rank_blend
            )));
        }
        if self.budget.first_share + self.budget.second_share > 1.0 {
            return Err(Error::InvalidConfig(
                "budget.first_share + budget.second_share must not exceed 1".to_string(),
            ));
        }
        let caps = [
            ("rerank.per_document_cap", self.rerank.per_document_cap),
            ("rerank.pool_cap", self.rerank.pool_cap),
            ("rerank.top_k", self.rerank.top_k),
            ("expansion.max_hits", self.expansion.max_hits),
            ("fallback.top_documents", self.fallback.top_documents),
            ("budget.total_chars", self.budget.total_chars),
        ];
        for (name, value) in caps {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { max_new_tokens: 256, temperature: 0.5, top_p: 0.92, repetition_penalty: 1.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusSettings {
    pub data_dir: String,
}

impl Default for CorpusSettings {
    fn default() -> Self {
        Self { data_dir: "../dev_data/txt".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    pub enabled: bool,
    pub path: String,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self { enabled: false, path: "localqa-trace.jsonl".to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub retrieval: RetrievalConfig,
    pub corpus: CorpusSettings,
    pub trace: TraceSettings,
    pub generation: SamplingConfig,
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wraps an already assembled figment; defaults are merged underneath.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Reads a path-valued key, expanding `~` and env vars, and joins it
    /// onto `base` when relative.
    pub fn path(&self, key: &str, base: &Path) -> anyhow::Result<PathBuf> {
        let raw: String = self.get(key)?;
        Ok(resolve_with_base(base, raw))
    }

    /// Extracts and validates the typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.retrieval.validate()?;
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
