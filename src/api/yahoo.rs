// ============================================================================
// API Client : Yahoo Finance
// ============================================================================
// Récupère l'historique journalier des marchés globaux (NYSE, NASDAQ)
//
// CONCEPTS RUST AVANCÉS :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : erreurs typées (DataError) propagées avec ?
// 3. Serde : désérialisation JSON automatique
// ============================================================================

use chrono::{DateTime, Duration, NaiveDate};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{DataError, Result};
use crate::models::{DateRange, OHLCData, OHLC};

/// User-Agent envoyé à Yahoo (les clients sans UA sont bloqués)
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// ============================================================================
// Structures pour parser la réponse JSON de Yahoo Finance
// ============================================================================
// Yahoo retourne un JSON complexe, on définit des structures qui matchent
// exactement la structure JSON pour que serde puisse désérialiser automatiquement
// ============================================================================

/// Réponse complète de l'API Yahoo Finance
#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    /// null quand le symbole est inconnu
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    /// Absent quand aucune séance n'existe dans la fenêtre
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

/// Données OHLCV (Open, High, Low, Close, Volume)
#[derive(Debug, Deserialize)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

// ============================================================================
// Client
// ============================================================================

/// Client Yahoo Finance
///
/// CONCEPT : un seul reqwest::Client réutilisé
/// - Le client garde un pool de connexions entre les appels
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    /// Client pointant vers une autre URL de base
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Récupère l'historique journalier d'un symbole sur une fenêtre de dates
    ///
    /// Une série vide est un résultat valide (symbole sans séance dans la fenêtre)
    ///
    /// # Exemple
    /// let data = client.fetch_daily("AAPL", range).await?;
    #[instrument(skip(self, range), fields(start = %range.start, end = %range.end))]
    pub async fn fetch_daily(&self, symbol: &str, range: DateRange) -> Result<OHLCData> {
        let url = build_yahoo_url(&self.base_url, symbol, range);
        debug!(url = %url, "Built Yahoo Finance API URL");

        let response = self.http.get(&url).send().await?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            return Err(DataError::Status {
                service: "Yahoo Finance",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let yahoo_response: YahooResponse = serde_json::from_str(&body)?;

        let data = parse_yahoo_response(yahoo_response, symbol, range)?;
        debug!(candles = data.len(), "Fetched Yahoo daily series");
        Ok(data)
    }
}

/// Construit l'URL de l'API Yahoo Finance
///
/// period2 est exclusif côté Yahoo : on ajoute un jour pour inclure `end`
fn build_yahoo_url(base_url: &str, symbol: &str, range: DateRange) -> String {
    let period1 = day_start_timestamp(range.start);
    let period2 = day_start_timestamp(range.end + Duration::days(1));

    format!(
        "{}/{}?interval=1d&period1={}&period2={}",
        base_url, symbol, period1, period2
    )
}

/// Valeur à l'index i, None si hors limites ou null dans le JSON
///
/// CONCEPT RUST : Option chaining
/// - get(i) : None si hors limites
/// - and_then(|&v| v) : None si la valeur JSON était null
fn value_at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).and_then(|&v| v)
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

/// Parse la réponse JSON de Yahoo et la convertit en OHLCData
///
/// CONCEPT RUST : Ownership et borrowing
/// - yahoo_response est "moved" (pas de &), on en devient propriétaire
/// - symbol est borrowed (&str), on ne le copie pas
fn parse_yahoo_response(
    yahoo_response: YahooResponse,
    symbol: &str,
    range: DateRange,
) -> Result<OHLCData> {
    if let Some(error) = yahoo_response.chart.error {
        if !error.is_null() {
            return Err(DataError::Parse(format!("Yahoo : {}", error)));
        }
    }

    let mut ohlc_data = OHLCData::new(symbol.to_string(), range);

    // Pas de résultat : série vide, pas une erreur
    let result = match yahoo_response.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(ohlc_data),
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = match result.indicators.quote.into_iter().next() {
        Some(quote) => quote,
        None => return Ok(ohlc_data),
    };

    let opens = quote.open.unwrap_or_default();
    let highs = quote.high.unwrap_or_default();
    let lows = quote.low.unwrap_or_default();
    let closes = quote.close.unwrap_or_default();
    let volumes = quote.volume.unwrap_or_default();

    let mut skipped_count = 0;
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let (open, high, low, close) = match (
            value_at(&opens, i),
            value_at(&highs, i),
            value_at(&lows, i),
            value_at(&closes, i),
        ) {
            (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
            _ => {
                skipped_count += 1;
                continue; // Skip cette séance si pas de données
            }
        };

        let volume = volumes.get(i).and_then(|&v| v).unwrap_or(0);

        let datetime = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| DataError::Parse(format!("Timestamp invalide : {}", timestamp)))?;

        ohlc_data.add_candle(OHLC::new(datetime, open, high, low, close, volume));
    }

    if skipped_count > 0 {
        warn!(
            skipped = skipped_count,
            total = timestamps.len(),
            "Skipped candles with missing data"
        );
    }

    ohlc_data.sort_chronologically();
    Ok(ohlc_data)
}

// ============================================================================
// Tests unitaires
// ============================================================================
