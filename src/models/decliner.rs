// ============================================================================
// Structure : Decliner
// ============================================================================
// Un résultat du scan des plus fortes baisses : (nom, code, variation %)
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::models::Symbol;

/// Symbole classé par variation de clôture sur la période scannée
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decliner {
    pub name: String,
    pub code: String,

    /// (dernière clôture - première clôture) / première clôture × 100
    pub change_percent: f64,
}

impl Decliner {
    pub fn new(symbol: &Symbol, change_percent: f64) -> Self {
        Self {
            name: symbol.name.clone(),
            code: symbol.code.clone(),
            change_percent,
        }
    }

    /// Formatte la variation avec flèche : "▼ -10.00%"
    pub fn change_label(&self) -> String {
        let arrow = if self.change_percent >= 0.0 { "▲" } else { "▼" };
        format!("{} {:+.2}%", arrow, self.change_percent)
    }
}

/// Trie par variation croissante (plus forte baisse en premier)
///
/// CONCEPT RUST : total_cmp
/// - Ordre total sur f64 (NaN compris)
pub fn sort_ascending(decliners: &mut [Decliner]) {
    decliners.sort_by(|a, b| a.change_percent.total_cmp(&b.change_percent));
}
