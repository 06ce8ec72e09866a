use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a persisted enum-like string does not parse. Invalid values
/// are rejected at the data-access edge, never carried into the domain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {what} value: '{value}'")]
pub struct ParseEnumError {
    pub what: &'static str,
    pub value: String,
}

/// Accounting direction of a transaction or article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxType {
    Income,
    Expense,
    Unknown,
}

impl TxType {
    pub fn as_str(self) -> &'static str {
        match self {
            TxType::Income => "income",
            TxType::Expense => "expense",
            TxType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TxType::Income),
            "expense" => Ok(TxType::Expense),
            "unknown" => Ok(TxType::Unknown),
            other => Err(ParseEnumError {
                what: "tx_type",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Contains,
    Regex,
}

impl PatternType {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::Contains => "contains",
            PatternType::Regex => "regex",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" => Ok(PatternType::Contains),
            "regex" => Ok(PatternType::Regex),
            other => Err(ParseEnumError {
                what: "pattern_type",
                value: other.to_string(),
            }),
        }
    }
}

/// What a versioned sale price refers to: a concrete mark or wall blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceKind {
    Concrete,
    Blocks,
}

impl PriceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceKind::Concrete => "concrete",
            PriceKind::Blocks => "blocks",
        }
    }
}

impl fmt::Display for PriceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concrete" => Ok(PriceKind::Concrete),
            "blocks" => Ok(PriceKind::Blocks),
            other => Err(ParseEnumError {
                what: "price_kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Finance,
    Counterparty,
}

impl ImportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportKind::Finance => "finance",
            ImportKind::Counterparty => "counterparty",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finance" => Ok(ImportKind::Finance),
            "counterparty" => Ok(ImportKind::Counterparty),
            other => Err(ParseEnumError {
                what: "import_kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Linear job progression; `Failed` is terminal, retry means a new job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ParseEnumError {
                what: "job_status",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_type_round_trip() {
        for t in [TxType::Income, TxType::Expense, TxType::Unknown] {
            assert_eq!(t.as_str().parse::<TxType>().unwrap(), t);
        }
    }

    #[test]
    fn invalid_value_is_rejected() {
        let err = "revenue".parse::<TxType>().unwrap_err();
        assert_eq!(err.what, "tx_type");
        assert!("fuzzy".parse::<PatternType>().is_err());
        assert!("cancelled".parse::<JobStatus>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_strings() {
        assert_eq!(serde_json::to_string(&TxType::Income).unwrap(), "\"income\"");
        assert_eq!(
            serde_json::from_str::<PriceKind>("\"blocks\"").unwrap(),
            PriceKind::Blocks
        );
    }
}
