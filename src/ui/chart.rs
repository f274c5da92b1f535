// ============================================================================
// Chart - Graphique des prix et du volume
// ============================================================================
// Courbe des clôtures, moyennes mobiles optionnelles, sparkline du volume
//
// CONCEPTS RUST :
// 1. Iterator chaining : transformer les chandelles en points (x, y)
// 2. Durée de vie des données : les Dataset empruntent des Vec qui doivent
//    vivre jusqu'au render_widget
//
// CONCEPTS RATATUI :
// 1. Chart + Dataset + Axis
// 2. Sparkline : mini-histogramme sur quelques lignes
// ============================================================================

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Sparkline},
    Frame,
};

use crate::config::Features;
use crate::models::OHLCData;
use crate::ui::dashboard::format_price;

/// Couleurs des moyennes mobiles, dans l'ordre des fenêtres configurées
const MA_COLORS: [Color; 4] = [Color::Yellow, Color::Magenta, Color::Blue, Color::White];

/// Dessine la courbe des clôtures
///
/// Avec `features.moving_averages`, une courbe par fenêtre de `ma_windows`
/// (les fenêtres plus longues que la série sont omises)
pub fn render_price_chart(frame: &mut Frame, data: &OHLCData, title: &str, features: &Features, area: Rect) {
    let closes: Vec<(f64, f64)> = data
        .candles
        .iter()
        .enumerate()
        .map(|(i, candle)| (i as f64, candle.close))
        .collect();

    // CONCEPT RUST : Vec<(usize, Vec<..>)> possédé ici
    // - Dataset::data() emprunte : les points doivent survivre au Chart
    let averages: Vec<(usize, Vec<(f64, f64)>)> = if features.moving_averages {
        features
            .ma_windows
            .iter()
            .map(|&window| (window, data.moving_average(window)))
            .filter(|(_, points)| !points.is_empty())
            .collect()
    } else {
        Vec::new()
    };

    let (low, high) = match (data.min_price(), data.max_price()) {
        (Some(low), Some(high)) => (low, high),
        _ => return,
    };

    // Marge de 5% pour que la courbe respire ; série plate → marge fixe
    let margin = ((high - low) * 0.05).max(high.abs() * 0.01).max(0.01);
    let y_min = (low - margin).max(0.0);
    let y_max = high + margin;

    let change = data.close_change_percent().unwrap_or(0.0);
    let color = if change >= 0.0 { Color::Green } else { Color::Red };

    let mut datasets = vec![Dataset::default()
        .name("Close")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&closes)];

    for (i, (window, points)) in averages.iter().enumerate() {
        datasets.push(
            Dataset::default()
                .name(format!("MA{}", window))
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(MA_COLORS[i % MA_COLORS.len()]))
                .data(points),
        );
    }

    let (first_date, last_date) = match (data.first(), data.last()) {
        (Some(first), Some(last)) => (first.date().to_string(), last.date().to_string()),
        _ => (String::new(), String::new()),
    };

    let x_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, (closes.len().max(2) - 1) as f64])
        .labels(vec![Span::raw(first_date), Span::raw(last_date)]);

    let y_axis = Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([y_min, y_max])
        .labels(vec![
            Span::raw(format_price(y_min)),
            Span::raw(format_price((y_min + y_max) / 2.0)),
            Span::raw(format_price(y_max)),
        ]);

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" 📈 {}  {:+.2}% ", title, change)),
        )
        .x_axis(x_axis)
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

/// Dessine le volume des dernières séances qui tiennent dans la largeur
pub fn render_volume(frame: &mut Frame, data: &OHLCData, area: Rect) {
    let width = area.width.saturating_sub(2) as usize;
    let skip = data.len().saturating_sub(width);
    let volumes: Vec<u64> = data.candles.iter().skip(skip).map(|c| c.volume).collect();

    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Gray))
                .title(" Volume "),
        )
        .data(&volumes)
        .style(Style::default().fg(Color::Cyan));

    frame.render_widget(sparkline, area);
}
