// Movimientos - bank notification e-mails → monthly movement ledgers
// Exposes all modules for use in the CLI and tests

pub mod documents;
pub mod error;
pub mod extractors;
pub mod ledger;
pub mod movement;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod settings;
pub mod validation;

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
pub mod ui;

// Re-export commonly used types
pub use documents::{load_documents, LoadOutcome};
pub use error::{LedgerError, LedgerResult, ParseError, Rejection};
pub use extractors::{BankExtractor, BcpExtractor, Document, InterbankExtractor};
pub use ledger::{
    ExistingIndex, LedgerStore, MergeEngine, MergeReport, Workbook, Worksheet,
};
pub use movement::{month_from_name, month_name, Bank, Currency, Movement, RawExtraction, Statement};
pub use normalize::{normalize, NormalizeOptions};
pub use pipeline::{Pipeline, RunSummary, SectionReport, UnitOutcome};
pub use registry::{MailDocument, ParseStats, ParserRegistry};
pub use settings::Settings;
pub use validation::{filter_by_bank_currency, filter_valid, FilterOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
