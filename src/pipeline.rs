// 🚚 Import pipeline - documents → statements → ledgers
//
// One unit of work per (bank, currency, year). A failing unit is reported and
// the run continues with the next one; nothing from it is saved.

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{LedgerEvent, LedgerStore, MergeEngine, MergeReport};
use crate::movement::{month_name, Bank, Currency, Movement, Statement};
use crate::registry::{MailDocument, ParseStats, ParserRegistry};
use crate::settings::Settings;
use crate::validation::{filter_by_bank_currency, filter_valid};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

const ACTOR: &str = "movimientos_importer";

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SectionReport {
    pub month: String,
    pub report: MergeReport,
}

#[derive(Debug)]
pub struct UnitOutcome {
    pub bank: Bank,
    pub currency: Currency,
    pub year: i32,
    pub path: PathBuf,
    pub result: LedgerResult<Vec<SectionReport>>,
}

impl UnitOutcome {
    pub fn written(&self) -> usize {
        match &self.result {
            Ok(sections) => sections.iter().map(|s| s.report.written()).sum(),
            Err(_) => 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub parse: ParseStats,
    pub zero_amount: usize,
    pub missing_fields: usize,
    /// Valid statements without a detected currency
    pub undetected_currency: usize,
    /// Valid statements for a (bank, currency) with no ledger configured
    pub unconfigured: usize,
    pub units: Vec<UnitOutcome>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.units.iter().map(UnitOutcome::written).sum()
    }

    pub fn busy_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(&u.result, Err(e) if e.is_retryable()))
            .count()
    }

    pub fn failed_units(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(&u.result, Err(e) if !e.is_retryable()))
            .count()
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    registry: ParserRegistry,
    engine: MergeEngine,
    settings: Settings,
    debug: bool,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Pipeline {
            registry: ParserRegistry::with_default_extractors(),
            engine: MergeEngine::new(),
            settings,
            debug: false,
        }
    }

    pub fn with_registry(mut self, registry: ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Write to the debug output directory instead of the ledger directory
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run(&self, documents: &[MailDocument]) -> RunSummary {
        let mut summary = RunSummary::default();

        let batch = self.registry.parse_batch(documents, &self.settings.normalize_options());
        summary.parse = batch.stats;

        let filtered = filter_valid(batch.statements);
        summary.zero_amount = filtered.zero_amount;
        summary.missing_fields = filtered.missing_fields;

        for statement in &filtered.kept {
            match statement.currency {
                None => {
                    tracing::warn!(bank = %statement.bank, "currency not detected, statement skipped");
                    summary.undetected_currency += 1;
                }
                Some(currency) if !self.settings.is_enabled(statement.bank, currency) => {
                    tracing::warn!(bank = %statement.bank, currency = %currency, "no ledger configured, statement skipped");
                    summary.unconfigured += 1;
                }
                Some(_) => {}
            }
        }

        let ledgers: BTreeSet<(Bank, Currency)> =
            self.settings.enabled_bank_currencies().into_iter().collect();
        let mut units: BTreeMap<(Bank, Currency, i32), Vec<Statement>> = BTreeMap::new();
        for (bank, currency) in ledgers {
            for statement in filter_by_bank_currency(&filtered.kept, bank, currency) {
                units
                    .entry((bank, currency, statement.year))
                    .or_default()
                    .push(statement.clone());
            }
        }

        for ((bank, currency, year), statements) in units {
            let path = self.settings.ledger_path(bank, currency, year, self.debug);
            let result = self.process_unit(bank, currency, year, &path, &statements);

            match &result {
                Ok(sections) => {
                    let written: usize = sections.iter().map(|s| s.report.written()).sum();
                    tracing::info!(%bank, %currency, year, written, path = %path.display(), "ledger updated");
                }
                Err(err @ LedgerError::Busy(_)) => {
                    tracing::warn!(%bank, %currency, year, error = %err, "ledger busy, retry once it is closed");
                }
                Err(err) => {
                    tracing::error!(%bank, %currency, year, error = %err, "ledger update failed");
                }
            }

            summary.units.push(UnitOutcome {
                bank,
                currency,
                year,
                path,
                result,
            });
        }

        summary
    }

    fn process_unit(
        &self,
        bank: Bank,
        currency: Currency,
        year: i32,
        path: &std::path::Path,
        statements: &[Statement],
    ) -> LedgerResult<Vec<SectionReport>> {
        let (mut store, mut workbook) =
            LedgerStore::load_or_provision(path, self.settings.ledger.template_path.as_deref())?;

        let mut by_month: BTreeMap<u32, Vec<Movement>> = BTreeMap::new();
        for statement in statements {
            by_month
                .entry(statement.month)
                .or_default()
                .extend(statement.movements.iter().cloned());
        }

        let mut sections = Vec::new();
        let mut events = Vec::new();

        for (month, movements) in by_month {
            let section = workbook.prepare_section(month, year, bank, currency)?;
            let report = self.engine.merge(section, &movements);
            let name = month_name(month).unwrap_or_default().to_string();

            events.push(LedgerEvent::new(
                "section_merged",
                &name,
                serde_json::json!({
                    "bank": bank,
                    "currency": currency,
                    "year": year,
                    "written_in_empty": report.written_in_empty,
                    "appended": report.appended,
                    "skipped_duplicates": report.skipped_duplicates,
                    "skipped_unmergeable": report.skipped_unmergeable,
                }),
                ACTOR,
            ));
            sections.push(SectionReport { month: name, report });
        }

        store.save_workbook(&workbook, &events)?;
        Ok(sections)
    }
}

// ============================================================================
// TESTS
// ============================================================================
