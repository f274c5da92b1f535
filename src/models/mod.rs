// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod decliner; // Résultat du scan des baisses
pub mod market;   // Marchés et sources de données
pub mod ohlc;     // Séances OHLCV, fenêtres de dates
pub mod symbol;   // Symbole (nom, code)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use lazymarket::models::symbol::Symbol;
// On peut faire : use lazymarket::models::Symbol;
pub use decliner::Decliner;
pub use market::{Market, Source};
pub use ohlc::{DateRange, OHLCData, ScanPeriod, Timeframe, OHLC};
pub use symbol::Symbol;
