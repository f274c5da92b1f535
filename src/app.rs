// ============================================================================
// Structure : App
// ============================================================================
// État global de l'application TUI, possédé par le thread principal
//
// CONCEPTS RUST :
// 1. State Management : tout l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
// 3. Résultats appliqués par valeur : main.rs fait les appels réseau,
//    App reçoit le Result et décide quoi afficher
//
// PATTERN : "Application State"
// - Tous les composants de l'UI lisent depuis App
// - Toutes les modifications passent par les méthodes de App
// ============================================================================

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::api::MarketDataSource;
use crate::config::{Features, ScannerConfig};
use crate::error::Result;
use crate::models::{Market, OHLCData, ScanPeriod, Symbol, Timeframe};
use crate::scanner::ScanReport;
use crate::watchlist::Watchlist;
use crate::worker::{ScanHandle, ScanWorker};

// ============================================================================
// Enums : Screen et Focus
// ============================================================================
// CONCEPT RUST : Enums pour state machines
// - Un seul écran actif à la fois
// - Le compilateur force à gérer tous les cas
// ============================================================================

/// Écrans de l'application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Onglet marché : symboles, watchlist, historique
    Market,

    /// Onglet des plus fortes baisses
    Decliners,

    /// Saisie du filtre de symboles (Enter valide, ESC annule)
    FilterInput,
}

/// Liste qui reçoit la navigation sur l'onglet marché
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Symbols,
    Watchlist,
}

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    pub current_screen: Screen,
    pub focus: Focus,

    /// Marché sélectionné (touches 1 à 4)
    pub market: Market,

    /// Liste complète du marché courant
    pub symbols: Vec<Symbol>,

    /// Filtre appliqué à la liste (insensible à la casse)
    pub filter: String,

    /// Index dans la liste *filtrée*
    pub symbol_index: usize,

    pub watchlist: Watchlist,
    pub watchlist_index: usize,

    /// Fenêtre de l'historique (touches [ et ])
    pub timeframe: Timeframe,

    /// Série affichée et le symbole / marché qui l'a produite
    pub history: Option<OHLCData>,
    pub history_symbol: Option<(Market, Symbol)>,

    /// Période du scan (touche p)
    pub scan_period: ScanPeriod,

    /// Dernier rapport reçu du worker
    pub report: Option<ScanReport>,
    pub decliner_index: usize,

    /// Scan en cours (au plus un)
    scan: Option<ScanHandle>,

    /// Message affiché dans la barre de statut
    pub status: Option<String>,

    /// Fonctionnalités optionnelles, résolues au démarrage
    pub features: Features,

    /// Two-step quit : première pression 'q' → true, deuxième → quit
    pub confirm_quit: bool,

    /// Two-step delete : première pression 'd' → true, deuxième → suppression
    pub confirm_delete: bool,

    /// Buffer du mode FilterInput
    pub input_buffer: String,
}

impl App {
    pub fn new(watchlist: Watchlist, features: Features) -> Self {
        Self {
            running: true,
            current_screen: Screen::Market,
            focus: Focus::Symbols,
            market: Market::default(),
            symbols: Vec::new(),
            filter: String::new(),
            symbol_index: 0,
            watchlist,
            watchlist_index: 0,
            timeframe: Timeframe::default(),
            history: None,
            history_symbol: None,
            scan_period: ScanPeriod::default(),
            report: None,
            decliner_index: 0,
            scan: None,
            status: None,
            features,
            confirm_quit: false,
            confirm_delete: false,
            input_buffer: String::new(),
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    // ========================================================================
    // Marché et liste de symboles
    // ========================================================================

    /// Change de marché ; retourne true si la liste doit être rechargée
    pub fn select_market(&mut self, market: Market) -> bool {
        if market == self.market && !self.symbols.is_empty() {
            return false;
        }
        self.market = market;
        self.symbols.clear();
        self.filter.clear();
        self.symbol_index = 0;
        true
    }

    /// Applique le résultat d'un chargement de liste
    ///
    /// Erreur → liste vide + message, l'application continue
    pub fn apply_listing(&mut self, market: Market, result: Result<Vec<Symbol>>) {
        if market != self.market {
            debug!(%market, current = %self.market, "Ignoring listing for another market");
            return;
        }
        match result {
            Ok(symbols) => {
                info!(%market, count = symbols.len(), "Listing applied");
                self.set_status(format!("{} : {} symboles", market, symbols.len()));
                self.symbols = symbols;
            }
            Err(e) => {
                error!(%market, error = %e, "Listing unavailable");
                self.symbols.clear();
                self.set_status(format!("{} : liste indisponible ({})", market, e));
            }
        }
        self.symbol_index = 0;
    }

    /// Symboles visibles après filtrage
    pub fn filtered_symbols(&self) -> Vec<&Symbol> {
        self.symbols.iter().filter(|s| s.matches(&self.filter)).collect()
    }

    pub fn selected_symbol(&self) -> Option<&Symbol> {
        self.filtered_symbols().get(self.symbol_index).copied()
    }

    pub fn selected_watchlist_entry(&self) -> Option<&str> {
        self.watchlist.get(self.watchlist_index)
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Symbols => Focus::Watchlist,
            Focus::Watchlist => Focus::Symbols,
        };
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Longueur de la liste qui reçoit la navigation
    fn focused_len(&self) -> usize {
        match (self.current_screen, self.focus) {
            (Screen::Decliners, _) => self.report.as_ref().map_or(0, |r| r.decliners.len()),
            (_, Focus::Symbols) => self.filtered_symbols().len(),
            (_, Focus::Watchlist) => self.watchlist.len(),
        }
    }

    fn focused_index_mut(&mut self) -> &mut usize {
        match (self.current_screen, self.focus) {
            (Screen::Decliners, _) => &mut self.decliner_index,
            (_, Focus::Symbols) => &mut self.symbol_index,
            (_, Focus::Watchlist) => &mut self.watchlist_index,
        }
    }

    /// CONCEPT RUST : Saturating arithmetic
    /// - saturating_sub() ne descend pas en dessous de 0
    pub fn navigate_up(&mut self) {
        let index = self.focused_index_mut();
        *index = index.saturating_sub(1);
    }

    pub fn navigate_down(&mut self) {
        let max_index = self.focused_len().saturating_sub(1);
        let index = self.focused_index_mut();
        *index = (*index + 1).min(max_index);
    }

    // ========================================================================
    // Historique
    // ========================================================================

    /// Symbole (et marché) dont on veut l'historique
    ///
    /// - Liste des symboles : marché courant
    /// - Watchlist : marché déduit du code ; entrée illisible → None
    /// - Onglet des baisses : marché du rapport
    pub fn history_target(&self) -> Option<(Market, Symbol)> {
        match (self.current_screen, self.focus) {
            (Screen::Decliners, _) => {
                let report = self.report.as_ref()?;
                let market = report.market?;
                let decliner = report.decliners.get(self.decliner_index)?;
                Some((market, Symbol::new(decliner.name.clone(), decliner.code.clone())))
            }
            (_, Focus::Symbols) => self.selected_symbol().map(|s| (self.market, s.clone())),
            (_, Focus::Watchlist) => {
                let entry = self.selected_watchlist_entry()?;
                let symbol = Symbol::from_display(entry)?;
                Some((Market::infer_from_code(&symbol.code), symbol))
            }
        }
    }

    /// Applique le résultat d'un chargement d'historique
    ///
    /// Erreur ou série vide → historique effacé + message ; le symbole est
    /// gardé pour qu'un changement de période relance le chargement
    pub fn apply_history(&mut self, market: Market, symbol: Symbol, result: Result<OHLCData>) {
        match result {
            Ok(data) if !data.is_empty() => {
                info!(code = %symbol.code, candles = data.len(), "History loaded");
                self.set_status(format!(
                    "{} : {} séances ({})",
                    symbol.display(),
                    data.len(),
                    self.timeframe.label()
                ));
                self.history = Some(data);
                self.history_symbol = Some((market, symbol));
            }
            Ok(_) => {
                warn!(code = %symbol.code, "Empty history");
                self.set_status(format!("{} : aucune donnée sur la période", symbol.display()));
                self.history = None;
                self.history_symbol = Some((market, symbol));
            }
            Err(e) => {
                if e.is_unavailable() {
                    warn!(code = %symbol.code, error = %e, "History unavailable");
                } else {
                    error!(code = %symbol.code, error = %e, "History fetch failed");
                }
                self.set_status(format!("{} : historique indisponible ({})", symbol.display(), e));
                self.history = None;
                self.history_symbol = Some((market, symbol));
            }
        }
    }

    pub fn next_timeframe(&mut self) {
        self.timeframe = self.timeframe.next();
    }

    pub fn previous_timeframe(&mut self) {
        self.timeframe = self.timeframe.previous();
    }

    // ========================================================================
    // Watchlist
    // ========================================================================

    /// Ajoute le symbole sélectionné à la watchlist
    pub fn add_selected_to_watchlist(&mut self) {
        let entry = match self.selected_symbol() {
            Some(symbol) => symbol.display(),
            None => return,
        };

        match self.watchlist.add(&entry) {
            Ok(true) => self.set_status(format!("Ajouté : {}", entry)),
            Ok(false) => self.set_status(format!("Déjà dans la watchlist : {}", entry)),
            Err(e) => {
                error!(entry = %entry, error = %e, "Failed to save watchlist");
                self.set_status(format!("Watchlist non sauvegardée ({})", e));
            }
        }
    }

    pub fn request_delete(&mut self) {
        self.confirm_delete = true;
    }

    pub fn cancel_delete(&mut self) {
        self.confirm_delete = false;
    }

    pub fn is_awaiting_delete_confirmation(&self) -> bool {
        self.confirm_delete
    }

    /// Supprime l'entrée sélectionnée de la watchlist
    ///
    /// Ajuste l'index si on a supprimé le dernier élément
    pub fn delete_selected_watchlist_entry(&mut self) {
        self.confirm_delete = false;
        let entry = match self.selected_watchlist_entry() {
            Some(entry) => entry.to_string(),
            None => return,
        };

        match self.watchlist.remove(&entry) {
            Ok(_) => {
                if self.watchlist_index >= self.watchlist.len() && self.watchlist_index > 0 {
                    self.watchlist_index -= 1;
                }
                self.set_status(format!("Retiré : {}", entry));
            }
            Err(e) => {
                error!(entry = %entry, error = %e, "Failed to save watchlist");
                self.set_status(format!("Watchlist non sauvegardée ({})", e));
            }
        }
    }

    // ========================================================================
    // Onglets et scan
    // ========================================================================

    /// Bascule Market ⇄ Decliners
    pub fn toggle_tab(&mut self) {
        self.current_screen = match self.current_screen {
            Screen::Decliners => Screen::Market,
            Screen::Market | Screen::FilterInput => Screen::Decliners,
        };
    }

    pub fn is_on_decliners(&self) -> bool {
        self.current_screen == Screen::Decliners
    }

    pub fn is_on_market(&self) -> bool {
        self.current_screen == Screen::Market
    }

    pub fn cycle_scan_period(&mut self) {
        self.scan_period = self.scan_period.next();
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    /// Lance un scan du marché courant
    ///
    /// Refusé (false) si un scan est déjà en cours
    pub fn start_scan(&mut self, source: Arc<dyn MarketDataSource>, config: ScannerConfig) -> bool {
        if let Some(running) = self.scan.as_ref().map(|handle| handle.market) {
            warn!(market = %running, "Scan already in progress");
            self.set_status(format!("Scan {} déjà en cours", running));
            return false;
        }

        match ScanWorker::spawn(source, config, self.market, self.scan_period) {
            Ok(handle) => {
                self.set_status(format!(
                    "Scan {} ({}) en cours...",
                    self.market,
                    self.scan_period.label()
                ));
                self.scan = Some(handle);
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to spawn scan worker");
                self.set_status(format!("Scan impossible ({})", e));
                false
            }
        }
    }

    /// Interroge le worker (non bloquant) ; true si un rapport est arrivé
    pub fn poll_scan(&mut self) -> bool {
        let report = match self.scan.as_mut().and_then(ScanHandle::try_take) {
            Some(report) => report,
            None => return false,
        };

        self.scan = None;
        self.set_status(report.summary());
        self.decliner_index = 0;
        self.report = Some(report);
        true
    }

    /// Annule le scan en cours et attend la fin du worker
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.scan.take() {
            info!(market = %handle.market, "Cancelling scan on exit");
            handle.shutdown();
        }
    }

    // ========================================================================
    // Quit confirmation
    // ========================================================================

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    // ========================================================================
    // Input Mode : filtre des symboles
    // ========================================================================

    /// Entre en saisie du filtre, prérempli avec le filtre actuel
    pub fn start_filter_input(&mut self) {
        self.current_screen = Screen::FilterInput;
        self.input_buffer = self.filter.clone();
    }

    pub fn cancel_input(&mut self) {
        self.current_screen = Screen::Market;
        self.input_buffer.clear();
    }

    /// Valide le filtre et revient sur l'onglet marché
    pub fn submit_input(&mut self) {
        self.filter = self.input_buffer.trim().to_string();
        self.input_buffer.clear();
        self.current_screen = Screen::Market;
        self.focus = Focus::Symbols;
        self.symbol_index = 0;
    }

    pub fn append_char(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn backspace(&mut self) {
        self.input_buffer.pop();
    }

    pub fn is_in_input_mode(&self) -> bool {
        self.current_screen == Screen::FilterInput
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::models::{DateRange, OHLC};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::time::Duration;

    fn app() -> App {
        App::new(Watchlist::empty(PathBuf::from("unused.json")), Features::default())
    }

    fn app_with_symbols() -> App {
        let mut app = app();
        app.apply_listing(
            Market::Kospi,
            Ok(vec![
                Symbol::new("삼성전자", "005930"),
                Symbol::new("SK하이닉스", "000660"),
                Symbol::new("삼성SDI", "006400"),
            ]),
        );
        app
    }

    fn series(closes: &[f64]) -> OHLCData {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut data = OHLCData::new("005930".to_string(), DateRange::new(start, start));
        for (i, close) in closes.iter().enumerate() {
            let day = start + chrono::Duration::days(i as i64);
            data.add_candle(OHLC::on_date(day, *close, *close, *close, *close, 10));
        }
        data
    }

    #[test]
    fn test_app_creation() {
        let app = app();
        assert!(app.is_running());
        assert_eq!(app.market, Market::Kospi);
        assert_eq!(app.current_screen, Screen::Market);
        assert!(!app.is_scanning());
    }

    #[test]
    fn test_navigation_clamped() {
        let mut app = app_with_symbols();

        app.navigate_down();
        app.navigate_down();
        app.navigate_down();
        assert_eq!(app.symbol_index, 2);

        app.navigate_up();
        app.navigate_up();
        app.navigate_up();
        assert_eq!(app.symbol_index, 0);
    }

    #[test]
    fn test_filter_input() {
        let mut app = app_with_symbols();
        app.start_filter_input();
        assert!(app.is_in_input_mode());
        for c in "삼성".chars() {
            app.append_char(c);
        }
        app.submit_input();

        assert_eq!(app.filtered_symbols().len(), 2);
        assert_eq!(app.selected_symbol().unwrap().code, "005930");

        // ESC ne touche pas au filtre en place
        app.start_filter_input();
        app.backspace();
        app.cancel_input();
        assert_eq!(app.filter, "삼성");
    }

    #[test]
    fn test_listing_failure_clears_symbols() {
        let mut app = app_with_symbols();
        app.apply_listing(
            Market::Kospi,
            Err(DataError::MissingListing {
                path: PathBuf::from("nyse-listed.csv"),
            }),
        );
        assert!(app.symbols.is_empty());
        assert!(app.status.as_deref().unwrap().contains("indisponible"));
    }

    #[test]
    fn test_select_market_resets_list() {
        let mut app = app_with_symbols();
        assert!(!app.select_market(Market::Kospi));
        assert!(app.select_market(Market::Nasdaq));
        assert!(app.symbols.is_empty());
        assert_eq!(app.market, Market::Nasdaq);

        // Une liste arrivée pour un autre marché est ignorée
        app.apply_listing(Market::Kospi, Ok(vec![Symbol::new("A", "000001")]));
        assert!(app.symbols.is_empty());
    }

    #[test]
    fn test_history_target_from_watchlist() {
        let mut app = app();
        app.focus = Focus::Watchlist;
        assert_eq!(app.history_target(), None);

        let dir = tempfile::tempdir().unwrap();
        let mut watchlist = Watchlist::load(dir.path().join("w.json")).unwrap();
        watchlist.add("Apple Inc. (AAPL)").unwrap();
        watchlist.add("garbage").unwrap();
        app.watchlist = watchlist;

        let (market, symbol) = app.history_target().unwrap();
        assert_eq!(market, Market::Nyse);
        assert_eq!(symbol.code, "AAPL");

        // Entrée illisible → aucune action
        app.navigate_down();
        assert_eq!(app.history_target(), None);
    }

    #[test]
    fn test_apply_history() {
        let mut app = app_with_symbols();
        let symbol = Symbol::new("삼성전자", "005930");

        app.apply_history(Market::Kospi, symbol.clone(), Ok(series(&[100.0, 90.0])));
        assert_eq!(app.history.as_ref().unwrap().len(), 2);

        app.apply_history(Market::Kospi, symbol.clone(), Ok(series(&[])));
        assert!(app.history.is_none());

        app.apply_history(Market::Kospi, symbol.clone(), Err(DataError::UnknownSymbol("005930".into())));
        assert!(app.history.is_none());

        // Après un échec, [ / ] peut relancer le même symbole
        assert_eq!(app.history_symbol, Some((Market::Kospi, symbol)));
    }

    #[test]
    fn test_watchlist_add_and_two_step_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_symbols();
        app.watchlist = Watchlist::load(dir.path().join("w.json")).unwrap();

        app.add_selected_to_watchlist();
        app.add_selected_to_watchlist();
        assert_eq!(app.watchlist.entries(), &["삼성전자 (005930)".to_string()]);

        app.focus = Focus::Watchlist;
        app.request_delete();
        assert!(app.is_awaiting_delete_confirmation());
        app.delete_selected_watchlist_entry();
        assert!(app.watchlist.is_empty());
        assert!(!app.is_awaiting_delete_confirmation());
    }

    #[test]
    fn test_toggle_tab_and_period() {
        let mut app = app();
        app.toggle_tab();
        assert!(app.is_on_decliners());
        app.toggle_tab();
        assert!(app.is_on_market());

        app.cycle_scan_period();
        assert_eq!(app.scan_period, ScanPeriod::OneWeek);
    }

    #[test]
    fn test_quit_confirmation() {
        let mut app = app();
        app.request_quit();
        assert!(app.is_awaiting_quit_confirmation());
        app.cancel_quit();
        assert!(!app.is_awaiting_quit_confirmation());
        app.quit();
        assert!(!app.is_running());
    }

    /// Source lente : le premier scan reste en vol pendant le test
    struct SlowSource;

    #[async_trait]
    impl MarketDataSource for SlowSource {
        async fn list_symbols(&self, _market: Market) -> Result<Vec<Symbol>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        async fn fetch_ohlcv(&self, _market: Market, symbol: &Symbol, range: DateRange) -> Result<OHLCData> {
            Ok(OHLCData::new(symbol.code.clone(), range))
        }
    }

    #[test]
    fn test_overlapping_scan_rejected() {
        let mut app = app();
        let source: Arc<dyn MarketDataSource> = Arc::new(SlowSource);

        assert!(app.start_scan(source.clone(), ScannerConfig::default()));
        assert!(!app.start_scan(source, ScannerConfig::default()));
        assert!(app.is_scanning());
        assert!(!app.poll_scan());

        app.shutdown();
        assert!(!app.is_scanning());
    }
}
