//! Rule-based transaction classification: prioritized contains/regex
//! patterns over the normalized description + counterparty text.

use batchplant_core::{PatternType, TxType};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::normalize_text;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("article kind mismatch: transaction is {tx_type}, article is {article_kind}")]
    KindMismatch {
        tx_type: TxType,
        article_kind: TxType,
    },
    #[error("cannot assign an article to an unclassified transaction")]
    UnknownTxType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    pub id: i64,
    pub kind: TxType,
    pub pattern_type: PatternType,
    pub pattern: String,
    pub priority: i64,
    pub is_active: bool,
    pub article_id: i64,
}

struct CompiledRule {
    rule: MappingRule,
    /// `None` for contains rules, and for regex rules whose pattern failed
    /// to compile — those are treated as non-matches, never an error.
    regex: Option<regex::Regex>,
}

pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Orders rules by priority descending, then id ascending, so that a
    /// priority tie always resolves to the earliest-created rule.
    pub fn new(rules: Vec<MappingRule>) -> Self {
        let mut rules: Vec<MappingRule> = rules.into_iter().filter(|r| r.is_active).collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        let compiled = rules
            .into_iter()
            .map(|rule| {
                let regex = match rule.pattern_type {
                    PatternType::Regex => RegexBuilder::new(&rule.pattern)
                        .case_insensitive(true)
                        .build()
                        .ok(),
                    PatternType::Contains => None,
                };
                CompiledRule { rule, regex }
            })
            .collect();
        Self { rules: compiled }
    }

    /// First matching rule wins; no match yields `(Unknown, None)`.
    /// Deterministic for a fixed rule set and input.
    pub fn classify(&self, description: &str, counterparty: &str) -> (TxType, Option<i64>) {
        let text = normalize_text(&format!("{description} {counterparty}"));

        for cr in &self.rules {
            let matched = match cr.rule.pattern_type {
                PatternType::Contains => text.contains(&normalize_text(&cr.rule.pattern)),
                PatternType::Regex => cr
                    .regex
                    .as_ref()
                    .is_some_and(|re| re.is_match(&text)),
            };
            if matched {
                return (cr.rule.kind, Some(cr.rule.article_id));
            }
        }
        (TxType::Unknown, None)
    }
}

/// Resolves which article column a classified transaction populates.
/// The article's kind must equal the transaction type; a mismatch is a hard
/// error and nothing is assigned. At most one side of the pair is set.
pub fn apply_article(
    tx_type: TxType,
    article_kind: TxType,
    article_id: i64,
) -> Result<(Option<i64>, Option<i64>), ClassifyError> {
    if tx_type == TxType::Unknown {
        return Err(ClassifyError::UnknownTxType);
    }
    if article_kind != tx_type {
        return Err(ClassifyError::KindMismatch {
            tx_type,
            article_kind,
        });
    }
    match tx_type {
        TxType::Income => Ok((Some(article_id), None)),
        TxType::Expense => Ok((None, Some(article_id))),
        TxType::Unknown => Err(ClassifyError::UnknownTxType),
    }
}
