// ============================================================================
// LazyMarket - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;       // Clients KRX / Yahoo, fichiers de cotation, trait MarketDataSource
pub mod app;       // État de l'application
pub mod config;    // Configuration TOML
pub mod error;     // DataError
pub mod models;    // Structures de données
pub mod scanner;   // Scan des plus fortes baisses
pub mod ui;        // Interface utilisateur
pub mod watchlist; // Watchlist persistée
pub mod worker;    // Thread de scan en arrière-plan
