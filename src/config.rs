// ============================================================================
// Module : config
// ============================================================================
// Configuration de l'application, lue une seule fois au démarrage
//
// Fichier TOML : $LAZYMARKET_CONFIG, sinon ./lazymarket.toml
// Toutes les sections sont optionnelles (valeurs par défaut via serde)
//
// CONCEPTS RUST :
// 1. #[serde(default)] : un champ absent prend la valeur de Default
// 2. PathBuf : chemin possédé, cross-platform
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::Market;

/// Variable d'environnement qui pointe vers le fichier de config
pub const CONFIG_ENV_VAR: &str = "LAZYMARKET_CONFIG";

/// Fichier de config par défaut (répertoire courant)
pub const DEFAULT_CONFIG_FILE: &str = "lazymarket.toml";

/// Configuration complète
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listings: ListingsConfig,
    pub scanner: ScannerConfig,
    pub storage: StorageConfig,
    pub features: Features,
    pub logging: LoggingConfig,
}

/// Fichiers de cotation des marchés globaux
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingsConfig {
    pub nyse_csv: PathBuf,
    pub nasdaq_csv: PathBuf,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            nyse_csv: PathBuf::from("nyse-listed.csv"),
            nasdaq_csv: PathBuf::from("nasdaq-listed.csv"),
        }
    }
}

impl ListingsConfig {
    /// Fichier de cotation d'un marché global (None pour les marchés domestiques)
    pub fn path_for(&self, market: Market) -> Option<&Path> {
        match market {
            Market::Nyse => Some(self.nyse_csv.as_path()),
            Market::Nasdaq => Some(self.nasdaq_csv.as_path()),
            Market::Kospi | Market::Kosdaq => None,
        }
    }
}

/// Bornes du scanner de baisses
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Nombre maximum de résultats
    pub max_results: usize,

    /// Marchés domestiques : nombre de symboles pris en tête de liste
    pub domestic_sample: usize,

    /// Marchés globaux : taille d'un lot tiré au hasard
    pub batch_size: usize,

    /// Plafond de requêtes par scan, toutes sources confondues
    pub max_attempts: usize,

    /// Pause entre deux requêtes (rate limiting), 0 = aucune
    pub request_delay_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_results: 20,
            domestic_sample: 100,
            batch_size: 100,
            max_attempts: 300,
            request_delay_ms: 0,
        }
    }
}

/// Stockage persistant
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub watchlist_path: PathBuf,
}

impl Default for StorageConfig {
    /// CONCEPT : dirs::data_dir()
    /// - Linux : ~/.local/share/lazymarket/watchlist.json
    /// - macOS : ~/Library/Application Support/lazymarket/watchlist.json
    /// - Repli sur le répertoire courant si introuvable
    fn default() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            watchlist_path: base.join("lazymarket").join("watchlist.json"),
        }
    }
}

/// Fonctionnalités optionnelles de l'UI, résolues au démarrage
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Features {
    /// Affiche les moyennes mobiles sur le graphique des prix
    pub moving_averages: bool,

    /// Fenêtres des moyennes mobiles (en séances)
    pub ma_windows: Vec<usize>,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            moving_averages: true,
            ma_windows: vec![5, 20, 60],
        }
    }
}

/// Logging vers fichier
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,

    /// Filtre EnvFilter par défaut (RUST_LOG a priorité)
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./logs"),
            filter: "lazymarket=debug,info".to_string(),
        }
    }
}

impl Config {
    /// Charge la config depuis le chemin indiqué par l'environnement ou le défaut
    ///
    /// Fichier absent → valeurs par défaut ; fichier invalide → erreur
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Échec de la lecture de {}", path.display()))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Config invalide : {}", path.display()))?;

        info!(?path, "Configuration chargée");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
