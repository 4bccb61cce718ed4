// ⚙️ Settings - movimientos.toml + MOVIMIENTOS__* environment overrides

use crate::ledger::store::generate_file_name;
use crate::movement::{Bank, Currency};
use crate::normalize::NormalizeOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "movimientos.toml";
pub const ENV_PREFIX: &str = "MOVIMIENTOS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub email: EmailSettings,
    pub banks: Vec<BankSettings>,
    pub ledger: LedgerSettings,
    pub debug: DebugSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// tracing filter level for this crate
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// Only mail from these senders is imported (empty = accept all)
    pub allowed_senders: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSettings {
    pub name: Bank,
    pub currencies: Vec<Currency>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub store_dir: PathBuf,
    /// Store file copied into new ledgers instead of the built-in template
    pub template_path: Option<PathBuf>,
    /// Currency for documents without any currency marker
    pub fallback_currency: Option<Currency>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    /// Ledgers go here instead of `ledger.store_dir` in debug runs
    pub output_dir: PathBuf,
    pub verbose_logging: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            email: EmailSettings::default(),
            banks: vec![
                BankSettings {
                    name: Bank::Bcp,
                    currencies: vec![Currency::Soles, Currency::Dolares],
                    enabled: true,
                },
                BankSettings {
                    name: Bank::Interbank,
                    currencies: vec![Currency::Soles],
                    enabled: true,
                },
            ],
            ledger: LedgerSettings::default(),
            debug: DebugSettings::default(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            allowed_senders: vec![
                "notificaciones@notificacionesbcp.com.pe".to_string(),
                "bancaporinternet@empresas.interbank.pe".to_string(),
            ],
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("./ledgers"),
            template_path: None,
            fallback_currency: None,
        }
    }
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./debug-output"),
            verbose_logging: false,
        }
    }
}

impl Settings {
    /// Load from `path` (or `movimientos.toml`, optional) plus environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, config::Environment::with_prefix(ENV_PREFIX).separator("__"))
    }

    fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path).required(true)),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_PATH).required(false)),
        };
        builder = builder.add_source(env);
        builder.build()?.try_deserialize()
    }

    /// (bank, currency) pairs that get a ledger
    pub fn enabled_bank_currencies(&self) -> Vec<(Bank, Currency)> {
        self.banks
            .iter()
            .filter(|b| b.enabled)
            .flat_map(|b| b.currencies.iter().map(move |c| (b.name, *c)))
            .collect()
    }

    pub fn is_enabled(&self, bank: Bank, currency: Currency) -> bool {
        self.enabled_bank_currencies().contains(&(bank, currency))
    }

    pub fn store_dir(&self, debug: bool) -> &Path {
        if debug {
            &self.debug.output_dir
        } else {
            &self.ledger.store_dir
        }
    }

    pub fn ledger_path(&self, bank: Bank, currency: Currency, year: i32, debug: bool) -> PathBuf {
        self.store_dir(debug).join(generate_file_name(bank, currency, year))
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            fallback_currency: self.ledger.fallback_currency,
        }
    }

    /// Sender allow-list check (case-insensitive)
    pub fn is_sender_allowed(&self, sender: &str) -> bool {
        let allowed = &self.email.allowed_senders;
        allowed.is_empty() || allowed.iter().any(|a| a.trim().eq_ignore_ascii_case(sender.trim()))
    }
}
