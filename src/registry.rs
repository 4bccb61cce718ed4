// 📚 Parser Registry - ordered set of extractors
// Explicitly constructed and owned by the pipeline; tests build their own.

use crate::error::ParseError;
use crate::extractors::{BankExtractor, BcpExtractor, Document, InterbankExtractor};
use crate::normalize::{normalize, NormalizeOptions};
use crate::movement::Statement;
use serde::{Deserialize, Serialize};

/// Input document: markup body plus optional sender address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MailDocument {
    pub body: String,
    pub sender: Option<String>,
    /// Where it came from (file path, message id), for logs only
    pub origin: String,
}

impl MailDocument {
    pub fn new(body: impl Into<String>, sender: Option<&str>) -> Self {
        MailDocument {
            body: body.into(),
            sender: sender.map(str::to_string),
            origin: String::new(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

/// Per-batch parse counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub documents: usize,
    pub parsed: usize,
    pub undetected: usize,
    pub malformed_date: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub statements: Vec<Statement>,
    pub stats: ParseStats,
}

pub struct ParserRegistry {
    extractors: Vec<Box<dyn BankExtractor>>,
}

impl ParserRegistry {
    /// Empty registry
    pub fn new() -> Self {
        ParserRegistry { extractors: Vec::new() }
    }

    /// Every supported bank, in detection order
    pub fn with_default_extractors() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(BcpExtractor::new()));
        registry.register(Box::new(InterbankExtractor::new()));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn BankExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn extractors(&self) -> &[Box<dyn BankExtractor>] {
        &self.extractors
    }

    /// First extractor whose detector matches.
    ///
    /// Sender matches are tried across all extractors before any body match,
    /// so a BCP account quoted in an Interbank e-mail can't steal it.
    pub fn find_match(&self, doc: &Document, sender: Option<&str>) -> Option<&dyn BankExtractor> {
        if let Some(sender) = sender {
            if let Some(ex) = self.extractors.iter().find(|ex| ex.matches_sender(sender)) {
                return Some(ex.as_ref());
            }
        }

        self.extractors
            .iter()
            .find(|ex| ex.matches_body(doc))
            .map(|ex| ex.as_ref())
    }

    /// detect → extract → normalize for one document
    pub fn parse_one(
        &self,
        body: &str,
        sender: Option<&str>,
        opts: &NormalizeOptions,
    ) -> Result<Statement, ParseError> {
        let doc = Document::parse(body);

        let extractor = match self.find_match(&doc, sender) {
            Some(ex) => ex,
            None => {
                tracing::warn!(sender = sender.unwrap_or(""), "could not detect bank from document");
                return Err(ParseError::UndetectedFormat);
            }
        };

        let bank = extractor.bank();
        let mut raw = extractor.extract_fields(&doc);
        raw.currency_hint = extractor.extract_currency(&doc);

        tracing::debug!(
            bank = %bank,
            version = extractor.version(),
            operation = %raw.operation_id,
            amount = %raw.amount,
            "extracted fields"
        );

        normalize(raw, bank, opts).map_err(|err| {
            tracing::warn!(bank = %bank, error = %err, "discarding document");
            err
        })
    }

    /// Parse every document; failures are counted, never fatal
    pub fn parse_batch(&self, documents: &[MailDocument], opts: &NormalizeOptions) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for doc in documents {
            outcome.stats.documents += 1;
            match self.parse_one(&doc.body, doc.sender.as_deref(), opts) {
                Ok(statement) => {
                    outcome.stats.parsed += 1;
                    outcome.statements.push(statement);
                }
                Err(ParseError::UndetectedFormat) => {
                    tracing::debug!(origin = %doc.origin, "undetected format");
                    outcome.stats.undetected += 1;
                }
                Err(ParseError::MalformedDate { .. }) => {
                    tracing::debug!(origin = %doc.origin, "malformed date");
                    outcome.stats.malformed_date += 1;
                }
            }
        }

        outcome
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_extractors()
    }
}

// ============================================================================
// TESTS
// ============================================================================
