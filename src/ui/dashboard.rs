// ============================================================================
// Dashboard - Rendu de l'interface principale
// ============================================================================
// Header (onglets des marchés), contenu selon l'écran, footer (statut et
// raccourcis)
//
// CONCEPTS RATATUI :
// 1. Layout : découpage de l'espace en zones
// 2. Widgets stateful : List et Table avec un état de sélection
// 3. Tabs : onglets des marchés
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};

use crate::app::{App, Focus, Screen};
use crate::models::{Market, OHLCData};
use crate::ui::{chart, decliners};

/// Dessine l'interface complète
///
/// CONCEPT RUST : Routing avec match sur enum
/// - Le compilateur garantit que chaque écran est géré
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = create_layout(frame.size());

    render_header(frame, app, chunks[0]);

    match app.current_screen {
        Screen::Market | Screen::FilterInput => render_market(frame, app, chunks[1]),
        Screen::Decliners => decliners::render_decliners(frame, app, chunks[1]),
    }

    if app.is_in_input_mode() {
        render_input_footer(frame, app, chunks[2]);
    } else {
        render_footer(frame, app, chunks[2]);
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Header, contenu, footer (statut + raccourcis)
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Onglets
            Constraint::Min(0),    // Contenu
            Constraint::Length(4), // Statut + raccourcis
        ])
        .split(area)
        .to_vec()
}

/// Bordure jaune sur le panneau qui reçoit la navigation
fn panel_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Yellow } else { Color::Cyan };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title)
}

fn highlight_style() -> Style {
    Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
}

// ============================================================================
// Header : onglets des marchés
// ============================================================================

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Market::ALL
        .iter()
        .enumerate()
        .map(|(i, market)| Line::from(format!("{} {}", i + 1, market.label())))
        .collect();

    let tab = if app.is_on_decliners() { "Decliners" } else { "Market" };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" LazyMarket · {} ", tab))
        .title_alignment(Alignment::Center);

    let tabs = Tabs::new(titles)
        .block(block)
        .select(app.market.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        .divider("│");

    frame.render_widget(tabs, area);
}

// ============================================================================
// Onglet marché
// ============================================================================

/// Colonne gauche : symboles + watchlist ; colonne droite : historique
fn render_market(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(32), Constraint::Percentage(68)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(columns[0]);

    render_symbols(frame, app, left[0]);
    render_watchlist(frame, app, left[1]);
    render_history(frame, app, columns[1]);
}

fn render_symbols(frame: &mut Frame, app: &App, area: Rect) {
    let symbols = app.filtered_symbols();
    let title = if app.filter.is_empty() {
        format!(" {} ({}) ", app.market, symbols.len())
    } else {
        format!(" {} · \"{}\" ({}/{}) ", app.market, app.filter, symbols.len(), app.symbols.len())
    };
    let block = panel_block(title, app.focus == Focus::Symbols);

    if symbols.is_empty() {
        let message = if app.symbols.is_empty() {
            "Aucun symbole chargé"
        } else {
            "Aucun symbole ne correspond au filtre"
        };
        let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(Color::Gray)))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = symbols
        .iter()
        .map(|symbol| {
            let style = if app.watchlist.contains(&symbol.display()) {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            ListItem::new(format!("{:<8} {}", symbol.code, symbol.name)).style(style)
        })
        .collect();

    // CONCEPT RATATUI : Widget stateful
    // - ListState garde la sélection et fait défiler la liste pour qu'elle reste visible
    let mut state = ListState::default().with_selected(Some(app.symbol_index));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_watchlist(frame: &mut Frame, app: &App, area: Rect) {
    let block = panel_block(format!(" ★ Watchlist ({}) ", app.watchlist.len()), app.focus == Focus::Watchlist);

    if app.watchlist.is_empty() {
        let paragraph = Paragraph::new(Span::styled("Watchlist vide  [a] ajouter", Style::default().fg(Color::Gray)))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .watchlist
        .entries()
        .iter()
        .map(|entry| ListItem::new(entry.as_str()))
        .collect();

    let mut state = ListState::default().with_selected(Some(app.watchlist_index));
    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style())
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(list, area, &mut state);
}

// ============================================================================
// Historique : graphique, volume, tableau
// ============================================================================

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let (data, title) = match (&app.history, &app.history_symbol) {
        (Some(data), Some((market, symbol))) => (data, format!("{} · {} · {}", symbol.display(), market, app.timeframe.label())),
        _ => {
            let block = panel_block(format!(" Historique · {} ", app.timeframe.label()), false);
            let text = vec![
                Line::from(""),
                Line::from(Span::styled(
                    "[Enter] charger l'historique du symbole sélectionné",
                    Style::default().fg(Color::Gray),
                )),
            ];
            let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50), // Prix
            Constraint::Length(5),      // Volume
            Constraint::Min(4),         // Tableau
        ])
        .split(area);

    chart::render_price_chart(frame, data, &title, &app.features, rows[0]);
    chart::render_volume(frame, data, rows[1]);
    render_history_table(frame, data, rows[2]);
}

/// Tableau OHLCV, séance la plus récente en haut
fn render_history_table(frame: &mut Frame, data: &OHLCData, area: Rect) {
    let header = Row::new(vec!["Date", "Open", "High", "Low", "Close", "Volume"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = data
        .candles
        .iter()
        .rev()
        .map(|candle| {
            let color = if candle.is_bullish() { Color::Green } else { Color::Red };
            Row::new(vec![
                candle.date().format("%Y-%m-%d").to_string(),
                format_price(candle.open),
                format_price(candle.high),
                format_price(candle.low),
                format_price(candle.close),
                candle.volume.to_string(),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(panel_block(format!(" Séances ({}) ", data.len()), false));

    frame.render_stateful_widget(table, area, &mut TableState::default());
}

/// Prix : sans décimales au-delà de 1000 (wons), deux décimales sinon
pub fn format_price(price: f64) -> String {
    if price >= 1000.0 {
        format!("{:.0}", price)
    } else {
        format!("{:.2}", price)
    }
}

// ============================================================================
// Footer : statut et raccourcis
// ============================================================================

fn key_span(key: &'static str, color: Color) -> Span<'static> {
    Span::styled(key, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

/// Avertissement clignotant des confirmations two-step
fn confirmation_line(key: &'static str, action: String) -> Line<'static> {
    let warning = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("⚠  Appuyez sur ", warning),
        Span::styled(
            key,
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
        ),
        Span::styled(format!(" à nouveau pour {}, autre touche pour annuler ⚠", action), warning),
    ])
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut status = app.status.clone().unwrap_or_default();
    if app.is_scanning() && !status.contains("en cours") {
        status = format!("⏳ scan en cours · {}", status);
    }
    let status_line = Line::from(Span::styled(status, Style::default().fg(Color::White)));

    let shortcuts = if app.is_awaiting_delete_confirmation() {
        let entry = app.selected_watchlist_entry().unwrap_or("?").to_string();
        confirmation_line("[d]", format!("retirer {}", entry))
    } else if app.is_awaiting_quit_confirmation() {
        confirmation_line("[q]", "quitter".to_string())
    } else if app.is_on_decliners() {
        Line::from(vec![
            key_span("[s]", Color::Green),
            Span::raw(format!(" Scan {}  ", app.market)),
            key_span("[p]", Color::Yellow),
            Span::raw(format!(" Période: {}  ", app.scan_period.label())),
            key_span("[1-4]", Color::Yellow),
            Span::raw(" Marché  "),
            key_span("[Enter]", Color::Yellow),
            Span::raw(" Historique  "),
            key_span("[t]", Color::Yellow),
            Span::raw(" Market  "),
            key_span("[q]", Color::Red),
            Span::raw(" Quit"),
        ])
    } else {
        Line::from(vec![
            key_span("[1-4]", Color::Yellow),
            Span::raw(" Marché  "),
            key_span("[Tab]", Color::Yellow),
            Span::raw(" Focus  "),
            key_span("[/]", Color::Yellow),
            Span::raw(" Filtre  "),
            key_span("[Enter]", Color::Yellow),
            Span::raw(" Historique  "),
            key_span("[ ]", Color::Yellow),
            Span::raw(format!(" {}  ", app.timeframe.label())),
            key_span("[a]", Color::Green),
            Span::raw(" Ajouter  "),
            key_span("[d]", Color::Red),
            Span::raw(" Retirer  "),
            key_span("[t]", Color::Yellow),
            Span::raw(" Decliners  "),
            key_span("[q]", Color::Red),
            Span::raw(" Quit"),
        ])
    };

    let paragraph = Paragraph::new(vec![status_line, shortcuts]).block(block);
    frame.render_widget(paragraph, area);
}

/// Footer en mode saisie du filtre
fn render_input_footer(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let input_line = Line::from(vec![
        Span::styled("Filtre : ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(app.input_buffer.as_str(), Style::default().fg(Color::White)),
        Span::styled("█", Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK)),
    ]);

    let help_line = Line::from(vec![
        key_span("[Enter]", Color::Green),
        Span::raw(" Appliquer  "),
        key_span("[ESC]", Color::Red),
        Span::raw(" Annuler"),
    ]);

    let paragraph = Paragraph::new(vec![input_line, help_line]).block(block);
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Features;
    use crate::models::Symbol;
    use crate::watchlist::Watchlist;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(72700.0), "72700");
        assert_eq!(format_price(187.456), "187.46");
    }

    #[test]
    fn test_render_market_screen() {
        let mut app = App::new(Watchlist::empty("unused.json"), Features::default());
        app.apply_listing(Market::Kospi, Ok(vec![Symbol::new("삼성전자", "005930")]));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| render(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("KOSPI"));
        assert!(text.contains("005930"));
    }
}
