// ============================================================================
// Module : error
// ============================================================================
// Erreurs typées de la couche données (API KRX, Yahoo, fichiers CSV, watchlist)
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] génère l'implémentation de std::error::Error
// - #[error("...")] définit le message Display
// - #[from] génère un From<T> pour utiliser ? directement
//
// Le binaire (main.rs) continue d'utiliser anyhow pour ajouter du contexte.
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Erreur de la couche d'accès aux données
#[derive(Debug, Error)]
pub enum DataError {
    /// Échec du transport HTTP (connexion, timeout, corps illisible)
    #[error("Erreur HTTP : {0}")]
    Http(#[from] reqwest::Error),

    /// Le service a répondu avec un statut d'erreur
    #[error("{service} a retourné une erreur : HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// JSON invalide (réponse API ou fichier watchlist)
    #[error("JSON invalide : {0}")]
    Json(#[from] serde_json::Error),

    /// Fichier CSV illisible
    #[error("CSV invalide : {0}")]
    Csv(#[from] csv::Error),

    #[error("Erreur I/O : {0}")]
    Io(#[from] std::io::Error),

    /// Fichier de cotation absent (ex: nyse-listed.csv)
    #[error("{} introuvable", .path.display())]
    MissingListing { path: PathBuf },

    /// Colonne attendue absente d'un fichier de cotation
    #[error("Colonne manquante dans {file} : {column}")]
    MissingColumn { file: String, column: String },

    /// Symbole inconnu du service (ex: code KRX sans code standard)
    #[error("Symbole inconnu : {0}")]
    UnknownSymbol(String),

    /// Réponse structurellement inattendue
    #[error("Réponse invalide : {0}")]
    Parse(String),
}

/// Alias pratique pour la couche données
pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// Vrai si l'erreur signifie "données indisponibles" plutôt qu'un bug
    ///
    /// Utilisé par l'UI pour choisir entre "vider et signaler" et "logger fort"
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DataError::Http(_)
                | DataError::Status { .. }
                | DataError::MissingListing { .. }
                | DataError::UnknownSymbol(_)
        )
    }
}
