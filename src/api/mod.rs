// ============================================================================
// Module : api
// ============================================================================
// Ce module contient tous les clients API pour récupérer les données
// de marché : KRX (KOSPI, KOSDAQ), Yahoo Finance (NYSE, NASDAQ) et les
// fichiers de cotation CSV des marchés globaux
// ============================================================================

pub mod krx;     // Client du portail KRX
pub mod listing; // Fichiers de cotation NYSE / NASDAQ
pub mod source;  // Trait MarketDataSource + routeur MarketData
pub mod yahoo;   // Client API Yahoo Finance

// Re-export des types principaux
pub use source::{MarketData, MarketDataSource};
