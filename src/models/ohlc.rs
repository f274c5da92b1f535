// ============================================================================
// Structure : OHLC (Open, High, Low, Close, Volume)
// ============================================================================
// Représente une séance de cotation et les fenêtres de temps associées
//
// CONCEPTS RUST :
// 1. DateTime<Utc> : type de chrono pour dates avec timezone UTC
// 2. NaiveDate : date calendaire sans heure (bornes de requête)
// 3. f64 : floating point 64 bits pour les prix (précision suffisante)
// 4. u64 : unsigned 64 bits pour le volume (toujours positif)
// ============================================================================

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// DateRange : bornes d'une requête d'historique
// ============================================================================

/// Intervalle de dates calendaires, bornes incluses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Fenêtre glissante : start = today - days, end = today
    ///
    /// CONCEPT : Jours calendaires, pas jours de bourse
    /// - "1 Month" = 30 jours fixes, peu importe les week-ends et fériés
    pub fn lookback(days: u32, today: NaiveDate) -> Self {
        Self {
            start: today - Duration::days(days as i64),
            end: today,
        }
    }

    /// Format compact utilisé par le service KRX (ex: "20240131")
    pub fn start_compact(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    pub fn end_compact(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

// ============================================================================
// Timeframe : fenêtre d'historique affichée (table + graphiques)
// ============================================================================

/// Période de temps pour l'historique affiché
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    /// 7 jours
    OneWeek,
    /// 1 mois (30 jours)
    OneMonth,
    /// 3 mois
    ThreeMonths,
    /// 6 mois
    SixMonths,
    /// 1 an
    OneYear,
    /// 2 ans (730 jours)
    TwoYears,
}

impl Timeframe {
    /// Retourne le nombre de jours correspondant
    pub fn to_days(&self) -> u32 {
        match self {
            Timeframe::OneWeek => 7,
            Timeframe::OneMonth => 30,
            Timeframe::ThreeMonths => 90,
            Timeframe::SixMonths => 180,
            Timeframe::OneYear => 365,
            Timeframe::TwoYears => 730,
        }
    }

    /// Retourne le label pour l'affichage
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneWeek => "1W",
            Timeframe::OneMonth => "1M",
            Timeframe::ThreeMonths => "3M",
            Timeframe::SixMonths => "6M",
            Timeframe::OneYear => "1Y",
            Timeframe::TwoYears => "2Y",
        }
    }

    /// Fenêtre de dates se terminant aujourd'hui
    pub fn range_ending(&self, today: NaiveDate) -> DateRange {
        DateRange::lookback(self.to_days(), today)
    }

    /// Retourne le timeframe suivant (cycle)
    pub fn next(&self) -> Timeframe {
        match self {
            Timeframe::OneWeek => Timeframe::OneMonth,
            Timeframe::OneMonth => Timeframe::ThreeMonths,
            Timeframe::ThreeMonths => Timeframe::SixMonths,
            Timeframe::SixMonths => Timeframe::OneYear,
            Timeframe::OneYear => Timeframe::TwoYears,
            Timeframe::TwoYears => Timeframe::OneWeek, // Boucle
        }
    }

    /// Retourne le timeframe précédent (cycle)
    pub fn previous(&self) -> Timeframe {
        match self {
            Timeframe::OneWeek => Timeframe::TwoYears, // Boucle
            Timeframe::OneMonth => Timeframe::OneWeek,
            Timeframe::ThreeMonths => Timeframe::OneMonth,
            Timeframe::SixMonths => Timeframe::ThreeMonths,
            Timeframe::OneYear => Timeframe::SixMonths,
            Timeframe::TwoYears => Timeframe::OneYear,
        }
    }
}

impl Default for Timeframe {
    /// 3 mois par défaut : assez de séances pour une moyenne mobile 60
    fn default() -> Self {
        Timeframe::ThreeMonths
    }
}

// ============================================================================
// ScanPeriod : fenêtre du scan des plus fortes baisses
// ============================================================================

/// Période mesurée par le scanner de baisses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanPeriod {
    OneDay,
    OneWeek,
    OneMonth,
}

impl ScanPeriod {
    pub const ALL: [ScanPeriod; 3] = [ScanPeriod::OneDay, ScanPeriod::OneWeek, ScanPeriod::OneMonth];

    pub fn label(&self) -> &'static str {
        match self {
            ScanPeriod::OneDay => "1 Day",
            ScanPeriod::OneWeek => "1 Week",
            ScanPeriod::OneMonth => "1 Month",
        }
    }

    /// Jours calendaires de la fenêtre
    pub fn lookback_days(&self) -> u32 {
        match self {
            ScanPeriod::OneDay => 1,
            ScanPeriod::OneWeek => 7,
            ScanPeriod::OneMonth => 30,
        }
    }

    /// Parse un label ; tout label inconnu retombe sur "1 Day"
    pub fn from_label(label: &str) -> ScanPeriod {
        match label.trim() {
            "1 Week" => ScanPeriod::OneWeek,
            "1 Month" => ScanPeriod::OneMonth,
            _ => ScanPeriod::OneDay,
        }
    }

    pub fn next(&self) -> ScanPeriod {
        match self {
            ScanPeriod::OneDay => ScanPeriod::OneWeek,
            ScanPeriod::OneWeek => ScanPeriod::OneMonth,
            ScanPeriod::OneMonth => ScanPeriod::OneDay,
        }
    }
}

impl Default for ScanPeriod {
    fn default() -> Self {
        ScanPeriod::OneDay
    }
}

// ============================================================================
// OHLC : une séance
// ============================================================================

/// Une séance de cotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OHLC {
    /// Timestamp de la séance
    pub timestamp: DateTime<Utc>,

    /// Prix d'ouverture (Open)
    pub open: f64,

    /// Prix le plus haut (High)
    pub high: f64,

    /// Prix le plus bas (Low)
    pub low: f64,

    /// Prix de clôture (Close)
    pub close: f64,

    /// Volume échangé
    pub volume: u64,
}

impl OHLC {
    /// Constructeur : crée une nouvelle séance OHLC
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Séance datée à minuit UTC (données journalières)
    pub fn on_date(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_default();
        Self::new(timestamp, open, high, low, close, volume)
    }

    /// Vérifie si la séance est haussière (bullish)
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Date calendaire de la séance
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

// ============================================================================
// OHLCData : série d'un symbole
// ============================================================================

/// Série OHLCV d'un symbole sur une fenêtre de dates
///
/// CONCEPT RUST : Ownership
/// - OHLCData possède le Vec, le Vec possède tous les OHLC
/// - Produite à chaque requête, jamais mise en cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OHLCData {
    /// Code du symbole
    pub symbol: String,

    /// Fenêtre demandée
    pub range: DateRange,

    /// Séances triées par timestamp croissant
    pub candles: Vec<OHLC>,
}

impl OHLCData {
    /// Crée une série vide
    pub fn new(symbol: String, range: DateRange) -> Self {
        Self {
            symbol,
            range,
            candles: Vec::new(),
        }
    }

    /// Ajoute une séance
    pub fn add_candle(&mut self, candle: OHLC) {
        self.candles.push(candle);
    }

    /// Trie les séances par date croissante
    ///
    /// Le service KRX renvoie les séances de la plus récente à la plus ancienne
    pub fn sort_chronologically(&mut self) {
        self.candles.sort_by_key(|c| c.timestamp);
    }

    /// Retourne le nombre de séances
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Vérifie si la série est vide
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn first(&self) -> Option<&OHLC> {
        self.candles.first()
    }

    /// Retourne la séance la plus récente
    pub fn last(&self) -> Option<&OHLC> {
        self.candles.last()
    }

    /// Prix minimum (plus bas) sur toute la période
    ///
    /// CONCEPT RUST : fold
    /// - Un seul passage sur les chandelles
    pub fn min_price(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.candles.iter().map(|c| c.low).fold(f64::MAX, f64::min))
    }

    /// Prix maximum (plus haut) sur toute la période
    pub fn max_price(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.candles.iter().map(|c| c.high).fold(f64::MIN, f64::max))
    }

    /// Variation en pourcentage entre la première et la dernière clôture
    ///
    /// None si moins de 2 séances ou si la première clôture vaut 0
    ///
    /// Calcul : (dernière - première) * 100 / première
    /// La multiplication avant la division garde les cas ronds exacts
    /// (100 → 90 donne exactement -10.0)
    pub fn close_change_percent(&self) -> Option<f64> {
        if self.candles.len() < 2 {
            return None;
        }
        let first = self.first()?.close;
        let last = self.last()?.close;
        percent_change(first, last)
    }

    /// Moyenne mobile simple des clôtures
    ///
    /// CONCEPT : Fenêtre glissante
    /// - Retourne un point (index, moyenne) par séance à partir de la `window`-ième
    /// - Vide si la fenêtre est plus grande que la série (ou nulle)
    pub fn moving_average(&self, window: usize) -> Vec<(f64, f64)> {
        if window == 0 || self.candles.len() < window {
            return Vec::new();
        }

        let closes: Vec<f64> = self.candles.iter().map(|c| c.close).collect();
        let mut sum: f64 = closes[..window].iter().sum();
        let mut points = Vec::with_capacity(closes.len() - window + 1);
        points.push(((window - 1) as f64, sum / window as f64));

        for i in window..closes.len() {
            sum += closes[i] - closes[i - window];
            points.push((i as f64, sum / window as f64));
        }

        points
    }
}

/// Variation en pourcentage d'un prix de départ vers un prix d'arrivée
pub fn percent_change(first: f64, last: f64) -> Option<f64> {
    if first == 0.0 || !first.is_finite() || !last.is_finite() {
        return None;
    }
    Some((last - first) * 100.0 / first)
}

// ============================================================================
// Tests unitaires
// ============================================================================
