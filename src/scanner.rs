// ============================================================================
// Module : scanner
// ============================================================================
// Scan des plus fortes baisses d'un marché sur une période
//
// ALGORITHME :
// 1. Liste les symboles du marché (une erreur → rapport vide + notice)
// 2. Sélectionne les candidats :
//    - domestique : les N premiers symboles dans l'ordre de la liste
//    - global : la liste filtrée, mélangée, consommée par lots
// 3. Pour chaque candidat, un fetch à la fois :
//    - série exploitable → variation (dernière - première clôture) en %
//    - sinon → skip (valeur SkipReason, aucune erreur propagée)
// 4. S'arrête dès que max_results résultats sont accumulés, que les
//    candidats sont épuisés ou que max_attempts fetches ont été faits
// 5. Trie par variation croissante (plus forte baisse en premier)
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, instrument, warn};

use crate::api::MarketDataSource;
use crate::config::ScannerConfig;
use crate::models::decliner::sort_ascending;
use crate::models::ohlc::percent_change;
use crate::models::{DateRange, Decliner, Market, OHLCData, ScanPeriod, Source, Symbol};

// ============================================================================
// Résultat d'un fetch individuel
// ============================================================================

/// Raison pour laquelle un symbole n'est pas classé
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Aucune séance dans la fenêtre
    Empty,
    /// Moins de 2 séances : pas de variation calculable
    TooFewRows(usize),
    /// Clôture non exploitable (NaN, infini)
    NoUsableClose,
    /// Première clôture nulle : division impossible
    ZeroBaseline,
    /// Échec du fetch (réseau, parsing, symbole inconnu)
    Failed(String),
}

/// Issue du fetch d'un symbole
///
/// CONCEPT : valeur plutôt qu'exception
/// - La boucle d'échantillonnage inspecte cette valeur pour décider du skip
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Variation de clôture en %
    Usable(f64),
    Skipped(SkipReason),
}

/// Évalue une série : variation exploitable ou raison du skip
pub fn evaluate_series(data: &OHLCData) -> FetchOutcome {
    let (first, last) = match (data.first(), data.last()) {
        (Some(first), Some(last)) if data.len() >= 2 => (first.close, last.close),
        (None, _) | (_, None) => return FetchOutcome::Skipped(SkipReason::Empty),
        _ => return FetchOutcome::Skipped(SkipReason::TooFewRows(data.len())),
    };

    if !first.is_finite() || !last.is_finite() {
        return FetchOutcome::Skipped(SkipReason::NoUsableClose);
    }

    match percent_change(first, last) {
        Some(change) => FetchOutcome::Usable(change),
        None => FetchOutcome::Skipped(SkipReason::ZeroBaseline),
    }
}

// ============================================================================
// Rapport de scan
// ============================================================================

/// Résultat complet d'un scan, livré en une fois
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// None si le label de marché n'était pas reconnu
    pub market: Option<Market>,
    pub period: ScanPeriod,

    /// Triés par variation croissante, au plus max_results
    pub decliners: Vec<Decliner>,

    /// Nombre de fetches effectués
    pub attempted: usize,

    /// Nombre de symboles ignorés (série vide, trop courte, échec)
    pub skipped: usize,

    /// Message pour l'utilisateur (liste indisponible, marché inconnu)
    pub notice: Option<String>,
}

impl ScanReport {
    fn empty(market: Option<Market>, period: ScanPeriod) -> Self {
        Self {
            market,
            period,
            decliners: Vec::new(),
            attempted: 0,
            skipped: 0,
            notice: None,
        }
    }

    /// Rapport vide accompagné d'un message (scan impossible)
    pub fn aborted(market: Market, period: ScanPeriod, notice: impl Into<String>) -> Self {
        let mut report = Self::empty(Some(market), period);
        report.notice = Some(notice.into());
        report
    }

    /// Résumé d'une ligne pour la barre de statut
    pub fn summary(&self) -> String {
        match &self.notice {
            Some(notice) if self.decliners.is_empty() => notice.clone(),
            _ => format!(
                "{} baisses ({} fetches, {} ignorés)",
                self.decliners.len(),
                self.attempted,
                self.skipped
            ),
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// Scanner des plus fortes baisses
///
/// CONCEPT RUST : Générique avec ?Sized
/// - S peut être un type concret (tests) ou `dyn MarketDataSource` (prod)
/// - Arc<S> : la source est partagée avec le thread du worker
pub struct DeclinerScanner<S: MarketDataSource + ?Sized> {
    source: Arc<S>,
    config: ScannerConfig,

    /// Graine du tirage aléatoire (None → entropie du système)
    seed: Option<u64>,
}

impl<S: MarketDataSource + ?Sized> DeclinerScanner<S> {
    pub fn new(source: Arc<S>, config: ScannerConfig) -> Self {
        Self {
            source,
            config,
            seed: None,
        }
    }

    /// Fixe la graine pour un échantillonnage reproductible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Scan à partir de labels bruts ("NYSE", "1 Week")
    ///
    /// Marché inconnu → rapport vide sans erreur ; période inconnue → "1 Day"
    pub async fn scan_labels(&self, market_label: &str, period_label: &str) -> ScanReport {
        let period = ScanPeriod::from_label(period_label);
        match market_label.parse::<Market>() {
            Ok(market) => self.scan(market, period).await,
            Err(message) => {
                debug!(market = %market_label, "Unknown market label, empty scan");
                let mut report = ScanReport::empty(None, period);
                report.notice = Some(message);
                report
            }
        }
    }

    /// Scan avec "aujourd'hui" = date locale
    pub async fn scan(&self, market: Market, period: ScanPeriod) -> ScanReport {
        self.scan_on(market, period, Local::now().date_naive()).await
    }

    /// Scan avec une date de référence explicite
    #[instrument(skip(self, market, period, today), fields(market = %market, period = %period.label()))]
    pub async fn scan_on(&self, market: Market, period: ScanPeriod, today: NaiveDate) -> ScanReport {
        let range = DateRange::lookback(period.lookback_days(), today);
        let mut report = ScanReport::empty(Some(market), period);

        let listing = match self.source.list_symbols(market).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!(error = %e, "Listing unavailable, scan yields nothing");
                report.notice = Some(e.to_string());
                return report;
            }
        };

        let (candidates, batch_size) = self.select_candidates(market, listing);
        info!(
            candidates = candidates.len(),
            batch_size,
            start = %range.start,
            end = %range.end,
            "Starting decliner scan"
        );

        // CONCEPT RUST : Labeled break
        // - 'batches : sort des deux boucles d'un coup dès que le scan est satisfait
        'batches: for (batch_index, batch) in candidates.chunks(batch_size).enumerate() {
            debug!(batch = batch_index, size = batch.len(), "Scanning batch");

            for symbol in batch {
                if report.decliners.len() >= self.config.max_results {
                    break 'batches;
                }
                if report.attempted >= self.config.max_attempts {
                    warn!(attempted = report.attempted, "Attempt ceiling reached");
                    break 'batches;
                }

                report.attempted += 1;
                match self.fetch_outcome(market, symbol, range).await {
                    FetchOutcome::Usable(change) => {
                        report.decliners.push(Decliner::new(symbol, change));
                    }
                    FetchOutcome::Skipped(reason) => {
                        debug!(code = %symbol.code, ?reason, "Symbol skipped");
                        report.skipped += 1;
                    }
                }

                if self.config.request_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
                }
            }
        }

        sort_ascending(&mut report.decliners);
        report.decliners.truncate(self.config.max_results);

        info!(
            results = report.decliners.len(),
            attempted = report.attempted,
            skipped = report.skipped,
            "Decliner scan finished"
        );
        report
    }

    /// Ordre et découpage des candidats selon la source du marché
    ///
    /// Retourne (candidats, taille de lot)
    fn select_candidates(&self, market: Market, mut listing: Vec<Symbol>) -> (Vec<Symbol>, usize) {
        match market.source() {
            Source::Domestic => {
                listing.truncate(self.config.domestic_sample);
                let size = listing.len().max(1);
                (listing, size)
            }
            Source::Global => {
                // CONCEPT : tirage sans remise
                // - Un mélange puis des lots consécutifs = tirages successifs
                //   sans remise dans le pool restant
                let mut rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                listing.shuffle(&mut rng);
                (listing, self.config.batch_size.max(1))
            }
        }
    }

    /// Fetch d'un symbole converti en FetchOutcome
    ///
    /// Une erreur n'interrompt jamais le lot : elle devient Skipped(Failed)
    async fn fetch_outcome(&self, market: Market, symbol: &Symbol, range: DateRange) -> FetchOutcome {
        match self.source.fetch_ohlcv(market, symbol, range).await {
            Ok(data) => evaluate_series(&data),
            Err(e) => {
                if e.is_unavailable() {
                    debug!(code = %symbol.code, error = %e, "No data, skipping symbol");
                } else {
                    warn!(code = %symbol.code, error = %e, "Fetch failed, skipping symbol");
                }
                FetchOutcome::Skipped(SkipReason::Failed(e.to_string()))
            }
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    use crate::error::{DataError, Result};
    use crate::models::OHLC;

    /// Source en mémoire : clôtures par code, codes en échec
    struct StubSource {
        listing: Option<Vec<Symbol>>,
        closes: HashMap<String, Vec<f64>>,
        failing: Vec<String>,
        fetches: AtomicUsize,
    }

    impl StubSource {
        fn new(listing: Vec<Symbol>) -> Self {
            Self {
                listing: Some(listing),
                closes: HashMap::new(),
                failing: Vec::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn without_listing() -> Self {
            Self {
                listing: None,
                closes: HashMap::new(),
                failing: Vec::new(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn with_closes(mut self, code: &str, closes: &[f64]) -> Self {
            self.closes.insert(code.to_string(), closes.to_vec());
            self
        }

        fn failing(mut self, code: &str) -> Self {
            self.failing.push(code.to_string());
            self
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataSource for StubSource {
        async fn list_symbols(&self, _market: Market) -> Result<Vec<Symbol>> {
            self.listing.clone().ok_or_else(|| DataError::MissingListing {
                path: "nyse-listed.csv".into(),
            })
        }

        async fn fetch_ohlcv(&self, _market: Market, symbol: &Symbol, range: DateRange) -> Result<OHLCData> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&symbol.code) {
                return Err(DataError::Status {
                    service: "stub",
                    status: 404,
                });
            }

            let mut data = OHLCData::new(symbol.code.clone(), range);
            if let Some(closes) = self.closes.get(&symbol.code) {
                for (i, &close) in closes.iter().enumerate() {
                    let day = range.start + ChronoDuration::days(i as i64);
                    data.add_candle(OHLC::on_date(day, close, close, close, close, 100));
                }
            }
            Ok(data)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
    }

    fn symbols(codes: &[&str]) -> Vec<Symbol> {
        codes.iter().map(|c| Symbol::new(format!("Name {}", c), *c)).collect()
    }

    fn scanner(source: StubSource, config: ScannerConfig) -> DeclinerScanner<StubSource> {
        DeclinerScanner::new(Arc::new(source), config).with_seed(7)
    }

    #[test]
    fn test_evaluate_decline_is_exact() {
        let mut data = OHLCData::new("X".to_string(), DateRange::lookback(1, today()));
        data.add_candle(OHLC::on_date(today(), 100.0, 100.0, 100.0, 100.0, 1));
        data.add_candle(OHLC::on_date(today(), 90.0, 90.0, 90.0, 90.0, 1));
        assert_eq!(evaluate_series(&data), FetchOutcome::Usable(-10.0));
    }

    #[test]
    fn test_evaluate_gain_is_exact() {
        let mut data = OHLCData::new("X".to_string(), DateRange::lookback(1, today()));
        data.add_candle(OHLC::on_date(today(), 50.0, 50.0, 50.0, 50.0, 1));
        data.add_candle(OHLC::on_date(today(), 55.0, 55.0, 55.0, 55.0, 1));
        assert_eq!(evaluate_series(&data), FetchOutcome::Usable(10.0));
    }

    #[test]
    fn test_evaluate_skip_reasons() {
        let range = DateRange::lookback(1, today());
        let mut data = OHLCData::new("X".to_string(), range);
        assert_eq!(evaluate_series(&data), FetchOutcome::Skipped(SkipReason::Empty));

        data.add_candle(OHLC::on_date(today(), 0.0, 0.0, 0.0, 0.0, 1));
        assert_eq!(evaluate_series(&data), FetchOutcome::Skipped(SkipReason::TooFewRows(1)));

        data.add_candle(OHLC::on_date(today(), 5.0, 5.0, 5.0, 5.0, 1));
        assert_eq!(evaluate_series(&data), FetchOutcome::Skipped(SkipReason::ZeroBaseline));

        let mut nan = OHLCData::new("Y".to_string(), range);
        nan.add_candle(OHLC::on_date(today(), 1.0, 1.0, 1.0, f64::NAN, 1));
        nan.add_candle(OHLC::on_date(today(), 1.0, 1.0, 1.0, 2.0, 1));
        assert_eq!(evaluate_series(&nan), FetchOutcome::Skipped(SkipReason::NoUsableClose));
    }

    #[tokio::test]
    async fn test_single_row_series_never_reported() {
        let source = StubSource::new(symbols(&["000001", "000002", "000003"]))
            .with_closes("000001", &[100.0, 90.0])
            .with_closes("000002", &[42.0])
            .with_closes("000003", &[]);

        let report = scanner(source, ScannerConfig::default())
            .scan_on(Market::Kospi, ScanPeriod::OneWeek, today())
            .await;

        assert_eq!(report.decliners.len(), 1);
        assert_eq!(report.decliners[0].code, "000001");
        assert_eq!(report.attempted, 3);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_results_sorted_ascending() {
        let source = StubSource::new(symbols(&["AAA", "BBB", "CCC", "DDD"]))
            .with_closes("AAA", &[10.0, 11.0])
            .with_closes("BBB", &[10.0, 7.0])
            .with_closes("CCC", &[10.0, 9.5])
            .with_closes("DDD", &[10.0, 10.0]);

        let report = scanner(source, ScannerConfig::default())
            .scan_on(Market::Nasdaq, ScanPeriod::OneDay, today())
            .await;

        let changes: Vec<f64> = report.decliners.iter().map(|d| d.change_percent).collect();
        assert_eq!(changes.len(), 4);
        assert!(changes.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(report.decliners[0].code, "BBB");
    }

    #[tokio::test]
    async fn test_never_more_than_max_results() {
        let codes: Vec<String> = (0..500).map(|i| format!("{:06}", i)).collect();
        let listing: Vec<Symbol> = codes.iter().map(|c| Symbol::new("N", c.as_str())).collect();
        let mut source = StubSource::new(listing);
        for (i, code) in codes.iter().enumerate() {
            source = source.with_closes(code, &[100.0, 100.0 - (i % 50) as f64]);
        }

        let config = ScannerConfig {
            domestic_sample: 500,
            ..ScannerConfig::default()
        };
        let scanner = scanner(source, config);
        let report = scanner.scan_on(Market::Kosdaq, ScanPeriod::OneMonth, today()).await;

        assert_eq!(report.decliners.len(), 20);
        // Arrêt dès que 20 résultats sont accumulés
        assert_eq!(scanner.source.fetch_count(), 20);
    }

    #[tokio::test]
    async fn test_domestic_takes_first_n_in_order() {
        let source = StubSource::new(symbols(&["000001", "000002", "000003", "000004"]))
            .with_closes("000001", &[10.0, 9.0])
            .with_closes("000002", &[10.0, 8.0])
            .with_closes("000003", &[10.0, 1.0])
            .with_closes("000004", &[10.0, 1.0]);

        let config = ScannerConfig {
            domestic_sample: 2,
            ..ScannerConfig::default()
        };
        let report = scanner(source, config)
            .scan_on(Market::Kospi, ScanPeriod::OneDay, today())
            .await;

        let codes: Vec<&str> = report.decliners.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["000002", "000001"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let source = StubSource::new(symbols(&["AAA", "BBB", "CCC"]))
            .failing("BBB")
            .with_closes("AAA", &[10.0, 9.0])
            .with_closes("CCC", &[10.0, 8.0]);

        let report = scanner(source, ScannerConfig::default())
            .scan_on(Market::Nyse, ScanPeriod::OneDay, today())
            .await;

        assert_eq!(report.decliners.len(), 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.attempted, 3);
    }

    #[tokio::test]
    async fn test_global_sampling_respects_attempt_ceiling() {
        // Univers entièrement "délisté" : aucune série exploitable
        let codes: Vec<String> = (0..1000).map(|i| format!("X{}", i)).collect();
        let listing: Vec<Symbol> = codes.iter().map(|c| Symbol::new("Gone", c.as_str())).collect();
        let source = StubSource::new(listing);

        let config = ScannerConfig {
            max_attempts: 150,
            ..ScannerConfig::default()
        };
        let scanner = scanner(source, config);
        let report = scanner.scan_on(Market::Nyse, ScanPeriod::OneDay, today()).await;

        assert!(report.decliners.is_empty());
        assert_eq!(report.attempted, 150);
        assert_eq!(scanner.source.fetch_count(), 150);
    }

    #[tokio::test]
    async fn test_global_pool_exhaustion() {
        let source = StubSource::new(symbols(&["AAA", "BBB", "CCC"])).with_closes("AAA", &[1.0, 2.0]);

        let config = ScannerConfig {
            batch_size: 2,
            ..ScannerConfig::default()
        };
        let report = scanner(source, config)
            .scan_on(Market::Nasdaq, ScanPeriod::OneDay, today())
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.decliners.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_listing_yields_empty_report() {
        let scanner = scanner(StubSource::without_listing(), ScannerConfig::default());
        let report = scanner.scan_on(Market::Nyse, ScanPeriod::OneDay, today()).await;

        assert!(report.decliners.is_empty());
        assert_eq!(report.attempted, 0);
        assert_eq!(report.notice.as_deref(), Some("nyse-listed.csv introuvable"));
    }

    #[tokio::test]
    async fn test_missing_listing_file_end_to_end() {
        use crate::api::MarketData;
        use crate::config::ListingsConfig;

        let dir = tempfile::tempdir().unwrap();
        let source = MarketData::new(ListingsConfig {
            nyse_csv: dir.path().join("nyse-listed.csv"),
            nasdaq_csv: dir.path().join("nasdaq-listed.csv"),
        })
        .unwrap();

        let source: Arc<dyn MarketDataSource> = Arc::new(source);
        let scanner = DeclinerScanner::new(source, ScannerConfig::default());
        let report = scanner.scan(Market::Nasdaq, ScanPeriod::OneWeek).await;

        assert!(report.decliners.is_empty());
        assert!(report.notice.is_some());
    }

    #[tokio::test]
    async fn test_unknown_market_label() {
        let source = StubSource::new(symbols(&["AAA"])).with_closes("AAA", &[1.0, 0.5]);
        let scanner = scanner(source, ScannerConfig::default());

        let report = scanner.scan_labels("TSX", "1 Week").await;
        assert!(report.decliners.is_empty());
        assert_eq!(report.market, None);
        assert_eq!(report.period, ScanPeriod::OneWeek);
        assert_eq!(scanner.source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_period_label_defaults_to_one_day() {
        let source = StubSource::new(symbols(&["AAA"])).with_closes("AAA", &[1.0, 0.5]);
        let report = scanner(source, ScannerConfig::default())
            .scan_labels("NYSE", "quarterly")
            .await;

        assert_eq!(report.period, ScanPeriod::OneDay);
        assert_eq!(report.decliners[0].change_percent, -50.0);
    }
}
