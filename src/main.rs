// ============================================================================
// LazyMarket - Navigateur KOSPI / KOSDAQ / NYSE / NASDAQ
// ============================================================================
// Programme TUI : liste des symboles, historique OHLCV, watchlist persistée
// et scan des plus fortes baisses en arrière-plan
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop : rendu → événement → action, sur un seul thread
// 3. Async dans sync : runtime.block_on() pour les listes et l'historique
// 4. Thread dédié pour le scan, résultat interrogé sans bloquer
// ============================================================================

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};

use lazymarket::api::{MarketData, MarketDataSource};
use lazymarket::app::{App, Focus};
use lazymarket::config::{Config, LoggingConfig, ScannerConfig};
use lazymarket::models::{Market, Symbol};
use lazymarket::ui::{events::EventHandler, render, Event};
use lazymarket::watchlist::Watchlist;

// ============================================================================
// Action : travail demandé par une touche
// ============================================================================
// handle_event() ne fait que modifier l'état ; les appels réseau sont
// exécutés par run() après un rendu "Chargement..."
// ============================================================================

#[derive(Debug)]
enum Action {
    None,
    LoadListing(Market),
    LoadHistory(Market, Symbol),
    StartScan,
}

/// Ce dont l'event loop a besoin pour exécuter les actions
struct Services {
    runtime: Runtime,
    source: MarketData,
    scanner: ScannerConfig,
}

// ============================================================================
// Initialisation du logging
// ============================================================================
// Les println! ne fonctionnent pas une fois le TUI lancé : les logs vont
// dans un fichier avec rotation quotidienne
// ============================================================================

/// Initialise le logging vers ./logs/lazymarket.log (par défaut)
///
/// # Utilisation
/// ```bash
/// tail -f logs/lazymarket.log
/// RUST_LOG=lazymarket=trace cargo run
/// ```
fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    std::fs::create_dir_all(&config.dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.dir, "lazymarket.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true) // Distingue le thread du scan
                .with_line_number(true),
        )
        .with(
            // RUST_LOG a priorité sur le filtre de la config
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter)),
        )
        .try_init()
        .context("Subscriber déjà installé")?;

    info!(dir = ?config.dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    // Config invalide = erreur de démarrage (chaîne d'erreurs anyhow)
    let config = Config::load()?;

    init_logging(&config.logging).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {:#}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("LazyMarket starting up");

    let runtime = Runtime::new().context("Échec de la création du runtime tokio")?;
    let market_data = MarketData::new(config.listings.clone()).context("Échec de la création des clients HTTP")?;
    let services = Services {
        runtime,
        source: market_data,
        scanner: config.scanner.clone(),
    };

    // Watchlist illisible : on continue avec une liste vide
    let watchlist_path = config.storage.watchlist_path.clone();
    let (watchlist, watchlist_warning) = match Watchlist::load(watchlist_path.clone()) {
        Ok(watchlist) => (watchlist, None),
        Err(e) => {
            error!(path = ?watchlist_path, error = %e, "Watchlist unreadable, starting empty");
            (Watchlist::empty(watchlist_path), Some(format!("Watchlist illisible ({})", e)))
        }
    };

    let mut app = App::new(watchlist, config.features.clone());

    let market = app.market;
    println!("📊 Chargement de la liste {}...", market);
    load_listing(&mut app, &services, market);
    if let Some(warning) = watchlist_warning {
        app.set_status(warning);
    }

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;
    let events = EventHandler::new();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, &services);

    // Annule un scan en vol avant de rendre le terminal
    app.shutdown();

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Chargements synchrones (thread principal)
// ============================================================================

fn load_listing(app: &mut App, services: &Services, market: Market) {
    info!(%market, "Loading listing");
    let result = services.runtime.block_on(services.source.list_symbols(market));
    app.apply_listing(market, result);
}

fn load_history(app: &mut App, services: &Services, market: Market, symbol: Symbol) {
    let range = app.timeframe.range_ending(Local::now().date_naive());
    info!(%market, code = %symbol.code, start = %range.start, end = %range.end, "Loading history");
    let result = services
        .runtime
        .block_on(services.source.fetch_ohlcv(market, &symbol, range));
    app.apply_history(market, symbol, result);
}

/// Lance un scan avec ses propres clients HTTP (le worker a son runtime)
fn start_scan(app: &mut App, services: &Services) {
    match services.source.detached() {
        Ok(source) => {
            app.start_scan(Arc::new(source), services.scanner.clone());
        }
        Err(e) => {
            error!(error = %e, "Failed to create scan clients");
            app.set_status(format!("Scan impossible ({})", e));
        }
    }
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   0. Interroger le worker de scan (non bloquant)
//   1. Dessiner l'interface
//   2. Lire un événement (ou Tick après 250ms)
//   3. Exécuter l'action éventuelle
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    services: &Services,
) -> Result<()> {
    while app.is_running() {
        if app.poll_scan() {
            info!("Scan report received");
        }

        terminal.draw(|frame| render(frame, app))?;

        let event = match events.next() {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to read terminal event");
                continue;
            }
        };

        match handle_event(app, &event) {
            Action::None => {}
            Action::LoadListing(market) => {
                app.set_status(format!("Chargement de la liste {}...", market));
                terminal.draw(|frame| render(frame, app))?;
                load_listing(app, services, market);
            }
            Action::LoadHistory(market, symbol) => {
                app.set_status(format!("Chargement de {}...", symbol.display()));
                terminal.draw(|frame| render(frame, app))?;
                load_history(app, services, market, symbol);
            }
            Action::StartScan => start_scan(app, services),
        }
    }

    Ok(())
}

// ============================================================================
// Gestion des événements
// ============================================================================

/// Traite un événement et retourne l'action à exécuter
///
/// CONCEPT RUST : Pattern matching avec guards
/// - Chaque branche combine la touche et l'écran courant
/// - Le premier match gagne : l'ordre des branches compte
fn handle_event(app: &mut App, event: &Event) -> Action {
    use lazymarket::ui::events::{
        get_char_from_event, is_add_event, is_backspace_event, is_delete_event, is_down_event,
        is_enter_event, is_escape_event, is_filter_event, is_next_timeframe_event, is_period_event,
        is_previous_timeframe_event, is_quit_event, is_scan_event, is_tab_event, is_toggle_tab_event,
        is_up_event, market_from_event,
    };

    if matches!(event, Event::Tick) {
        return Action::None;
    }

    // Mode saisie : toutes les touches vont au buffer
    if app.is_in_input_mode() {
        if is_escape_event(event) {
            app.cancel_input();
        } else if is_enter_event(event) {
            app.submit_input();
            info!(filter = %app.filter, "Filter applied");
        } else if is_backspace_event(event) {
            app.backspace();
        } else if let Some(c) = get_char_from_event(event) {
            app.append_char(c);
        }
        return Action::None;
    }

    // Toute touche autre que celle attendue annule la confirmation en cours
    if !is_quit_event(event) {
        app.cancel_quit();
    }
    if !is_delete_event(event) {
        app.cancel_delete();
    }

    if is_quit_event(event) {
        if app.is_awaiting_quit_confirmation() {
            info!("User confirmed quit");
            app.quit();
        } else {
            app.request_quit();
        }
        return Action::None;
    }

    if let Some(market) = market_from_event(event) {
        return if app.select_market(market) {
            info!(%market, "User selected market");
            Action::LoadListing(market)
        } else {
            Action::None
        };
    }

    match event {
        _ if is_toggle_tab_event(event) => app.toggle_tab(),
        _ if is_up_event(event) => app.navigate_up(),
        _ if is_down_event(event) => app.navigate_down(),

        _ if is_enter_event(event) => {
            // Entrée illisible ou liste vide → aucune action
            if let Some((market, symbol)) = app.history_target() {
                if app.is_on_decliners() {
                    app.toggle_tab();
                }
                return Action::LoadHistory(market, symbol);
            }
        }

        _ if is_next_timeframe_event(event) || is_previous_timeframe_event(event) => {
            if is_next_timeframe_event(event) {
                app.next_timeframe();
            } else {
                app.previous_timeframe();
            }
            debug!(timeframe = %app.timeframe.label(), "Timeframe changed");
            if let Some((market, symbol)) = app.history_symbol.clone() {
                return Action::LoadHistory(market, symbol);
            }
        }

        // Onglet des baisses
        _ if is_period_event(event) => app.cycle_scan_period(),
        _ if is_scan_event(event) => return Action::StartScan,

        // Onglet marché
        _ if !app.is_on_market() => {}
        _ if is_tab_event(event) => app.toggle_focus(),
        _ if is_filter_event(event) => app.start_filter_input(),
        _ if is_escape_event(event) && !app.filter.is_empty() => {
            app.filter.clear();
            app.symbol_index = 0;
        }
        _ if is_add_event(event) && app.focus == Focus::Symbols => app.add_selected_to_watchlist(),
        _ if is_delete_event(event) && app.focus == Focus::Watchlist => {
            if app.is_awaiting_delete_confirmation() {
                info!(entry = ?app.selected_watchlist_entry(), "User confirmed delete");
                app.delete_selected_watchlist_entry();
            } else if app.selected_watchlist_entry().is_some() {
                app.request_delete();
            }
        }
        _ => {}
    }

    Action::None
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================
// IMPORTANT : toujours restaurer le terminal avant de quitter !
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}
