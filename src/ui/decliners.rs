// ============================================================================
// Decliners - Onglet des plus fortes baisses
// ============================================================================
// Tableau rang / nom / code / variation du dernier rapport de scan
// ============================================================================

use ratatui::{
    layout::{Alignment, Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;

pub fn render_decliners(frame: &mut Frame, app: &App, area: Rect) {
    let report = match &app.report {
        Some(report) => report,
        None => {
            render_placeholder(frame, app, area);
            return;
        }
    };

    let market = report.market.map(|m| m.label()).unwrap_or("?");
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(
            " ▼ Top baisses · {} · {} · {} fetches, {} ignorés ",
            market,
            report.period.label(),
            report.attempted,
            report.skipped
        ));

    if report.decliners.is_empty() {
        let message = report
            .notice
            .clone()
            .unwrap_or_else(|| "Aucun symbole exploitable".to_string());
        let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(Color::Gray)))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["#", "Nom", "Code", "Variation"])
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = report
        .decliners
        .iter()
        .enumerate()
        .map(|(rank, decliner)| {
            // Une "baisse" peut être une hausse si tout le marché a monté
            let color = if decliner.change_percent < 0.0 { Color::Red } else { Color::Green };
            Row::new(vec![
                (rank + 1).to_string(),
                decliner.name.clone(),
                decliner.code.clone(),
                decliner.change_label(),
            ])
            .style(Style::default().fg(color))
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(14),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
        .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(Some(app.decliner_index));
    frame.render_stateful_widget(table, area, &mut state);
}

/// Avant le premier scan (ou pendant)
fn render_placeholder(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" ▼ Top baisses ");

    let message = if app.is_scanning() {
        format!("Scan {} en cours...", app.market)
    } else {
        format!("[s] scanner {} sur {}", app.market, app.scan_period.label())
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(Color::Gray))),
    ];
    let paragraph = Paragraph::new(text).block(block).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}
