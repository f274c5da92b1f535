// ============================================================================
// Gestion des événements
// ============================================================================
// Lecture des événements clavier et ticks de l'application
//
// CONCEPTS RUST :
// 1. Enums avec variants : représenter différents types d'événements
// 2. Poll avec timeout : le tick laisse l'event loop interroger le worker
// 3. Error handling avec Result
// ============================================================================

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};

use crate::models::Market;

/// Délai de poll : cadence à laquelle l'event loop interroge le worker
const TICK_RATE: Duration = Duration::from_millis(250);

/// Événements de l'application
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Aucun événement pendant TICK_RATE
    Tick,
}

/// Gestionnaire d'événements (sans état)
pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    /// Lit le prochain événement, ou Tick après TICK_RATE
    ///
    /// CONCEPT : KeyEventKind
    /// - Certains OS envoient Press ET Release : seul Press compte
    /// - Resize, souris, etc. sont rendus comme des Tick
    pub fn next(&self) -> Result<Event> {
        if !event::poll(TICK_RATE)? {
            return Ok(Event::Tick);
        }

        match event::read()? {
            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => Ok(Event::Key(key)),
            _ => Ok(Event::Tick),
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : Convertir KeyEvent en action
// ============================================================================
// CONCEPT RUST : Pattern matching
// - if let Event::Key(key) destructure l'événement
// - matches! compare le KeyCode à un ou plusieurs patterns
// ============================================================================

/// CONCEPT RUST : Fonction générique sur une closure
/// - Factorise le "if let Event::Key" de tous les helpers
fn key_matches(event: &Event, predicate: impl Fn(KeyCode) -> bool) -> bool {
    match event {
        Event::Key(key) => predicate(key.code),
        _ => false,
    }
}

/// 'q' : quitter (deux pressions)
pub fn is_quit_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('q') | KeyCode::Char('Q')))
}

pub fn is_escape_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Esc))
}

pub fn is_enter_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Enter))
}

pub fn is_tab_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Tab))
}

/// Flèche haut ou 'k' (vim)
pub fn is_up_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('K')))
}

/// Flèche bas ou 'j' (vim)
pub fn is_down_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('J')))
}

/// ']' : fenêtre d'historique plus longue
pub fn is_next_timeframe_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char(']')))
}

/// '[' : fenêtre d'historique plus courte
pub fn is_previous_timeframe_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('[')))
}

/// '/' : saisie du filtre
pub fn is_filter_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('/')))
}

/// 'a' : ajouter à la watchlist
pub fn is_add_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('a') | KeyCode::Char('A')))
}

/// 'd' : retirer de la watchlist (deux pressions)
pub fn is_delete_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('d') | KeyCode::Char('D')))
}

/// F2 ou 't' : onglet Market ⇄ Decliners
pub fn is_toggle_tab_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::F(2) | KeyCode::Char('t') | KeyCode::Char('T')))
}

/// 'p' : période de scan suivante
pub fn is_period_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('p') | KeyCode::Char('P')))
}

/// 's' : lancer un scan
pub fn is_scan_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Char('s') | KeyCode::Char('S')))
}

pub fn is_backspace_event(event: &Event) -> bool {
    key_matches(event, |code| matches!(code, KeyCode::Backspace))
}

/// Touches '1' à '4' → marché correspondant
pub fn market_from_event(event: &Event) -> Option<Market> {
    match event {
        Event::Key(key) => match key.code {
            KeyCode::Char(c @ '1'..='4') => {
                let index = c.to_digit(10)? as usize - 1;
                Market::ALL.get(index).copied()
            }
            _ => None,
        },
        _ => None,
    }
}

/// Extrait le caractère imprimable d'un événement (saisie du filtre)
///
/// Accepte le hangul : les noms KRX se filtrent en coréen
pub fn get_char_from_event(event: &Event) -> Option<char> {
    if let Event::Key(key) = event {
        if let KeyCode::Char(c) = key.code {
            if !c.is_control() {
                return Some(c);
            }
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
