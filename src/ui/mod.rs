// ============================================================================
// Module : ui
// ============================================================================
// Gère toute l'interface utilisateur (Terminal User Interface)
// ============================================================================

pub mod chart;      // Graphique des prix + volume
pub mod dashboard;  // Layout, onglets, listes, historique, footer
pub mod decliners;  // Onglet des plus fortes baisses
pub mod events;     // Gestion des événements clavier

// Re-exports pour simplifier les imports
pub use dashboard::render;
pub use events::{Event, EventHandler};
