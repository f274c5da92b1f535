// ============================================================================
// Worker : scan des baisses en arrière-plan
// ============================================================================
// Un scan = un thread OS avec son propre runtime tokio
//
// CONCEPT RUST : Thread + async runtime
// - std::thread::Builder : crée un thread nommé (erreur de création = Result)
// - tokio::runtime::Runtime : exécute le scan async dans ce thread
// - mpsc channel : le rapport remonte au thread principal une seule fois
// - oneshot channel : le thread principal peut annuler le scan en cours
//
// Le thread principal ne bloque jamais : il interroge try_take() à chaque
// itération de l'event loop
// ============================================================================

use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::api::MarketDataSource;
use crate::config::ScannerConfig;
use crate::error::Result;
use crate::models::{Market, ScanPeriod};
use crate::scanner::{DeclinerScanner, ScanReport};

/// Lanceur de scans
pub struct ScanWorker;

impl ScanWorker {
    /// Démarre un scan sur un thread dédié
    ///
    /// Le rapport est disponible via ScanHandle::try_take() une fois le scan
    /// entièrement terminé. `source` ne doit pas partager ses clients HTTP
    /// avec un autre runtime (voir MarketData::detached)
    pub fn spawn(
        source: Arc<dyn MarketDataSource>,
        config: ScannerConfig,
        market: Market,
        period: ScanPeriod,
    ) -> Result<ScanHandle> {
        let (result_tx, result_rx) = mpsc::channel::<ScanReport>();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("scan-worker".to_string())
            .spawn(move || {
                // Runtime per-thread : détruit avec le thread à la fin du scan
                let runtime = match tokio::runtime::Runtime::new() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        error!(error = %e, "Failed to create scan runtime");
                        let _ = result_tx.send(ScanReport::aborted(
                            market,
                            period,
                            format!("Runtime indisponible : {}", e),
                        ));
                        return;
                    }
                };

                let scanner = DeclinerScanner::new(source, config);

                // CONCEPT RUST : tokio::select!
                // - La première branche terminée gagne, l'autre future est droppée
                // - Annuler = dropper le scan à son prochain point d'await
                let outcome = runtime.block_on(async {
                    tokio::select! {
                        report = scanner.scan(market, period) => Some(report),
                        _ = cancel_rx => None,
                    }
                });

                match outcome {
                    Some(report) => {
                        info!(
                            market = %market,
                            found = report.decliners.len(),
                            attempted = report.attempted,
                            "Scan finished"
                        );
                        // Le receveur a pu disparaître (application fermée)
                        if result_tx.send(report).is_err() {
                            debug!("Scan result dropped, receiver gone");
                        }
                    }
                    None => info!(market = %market, "Scan cancelled"),
                }
            })?;

        info!(market = %market, period = %period.label(), "Scan worker spawned");
        Ok(ScanHandle {
            market,
            period,
            result_rx,
            cancel_tx: Some(cancel_tx),
            thread: Some(thread),
        })
    }
}

/// Poignée sur un scan en cours
pub struct ScanHandle {
    pub market: Market,
    pub period: ScanPeriod,
    result_rx: mpsc::Receiver<ScanReport>,
    cancel_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Récupère le rapport s'il est prêt (non bloquant)
    ///
    /// Si le thread s'est terminé sans rapport (panic), renvoie un rapport
    /// vide avec un message pour libérer l'état "scan en cours"
    pub fn try_take(&mut self) -> Option<ScanReport> {
        match self.result_rx.try_recv() {
            Ok(report) => {
                self.join();
                Some(report)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                warn!(market = %self.market, "Scan worker exited without a report");
                self.join();
                Some(ScanReport::aborted(
                    self.market,
                    self.period,
                    "Le scan s'est interrompu",
                ))
            }
        }
    }

    /// Annule le scan puis attend la fin du thread
    pub fn shutdown(mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            // Erreur = le scan est déjà terminé
            let _ = cancel_tx.send(());
        }
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Scan worker panicked");
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
    use crate::models::{DateRange, OHLCData, Symbol, OHLC};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::time::{Duration, Instant};

    /// Source qui renvoie 100 → 90 pour chaque symbole
    struct FallingSource {
        delay: Duration,
    }

    #[async_trait]
    impl MarketDataSource for FallingSource {
        async fn list_symbols(&self, _market: Market) -> Result<Vec<Symbol>> {
            Ok(vec![Symbol::new("Alpha", "000010"), Symbol::new("Beta", "000020")])
        }

        async fn fetch_ohlcv(&self, _market: Market, symbol: &Symbol, range: DateRange) -> Result<OHLCData> {
            tokio::time::sleep(self.delay).await;
            let mut data = OHLCData::new(symbol.code.clone(), range);
            let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
            data.add_candle(OHLC::on_date(day, 100.0, 100.0, 100.0, 100.0, 1));
            data.add_candle(OHLC::on_date(day.succ_opt().unwrap(), 90.0, 90.0, 90.0, 90.0, 1));
            Ok(data)
        }
    }

    fn wait_for(handle: &mut ScanHandle) -> ScanReport {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(report) = handle.try_take() {
                return report;
            }
            assert!(Instant::now() < deadline, "scan did not finish");
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_report_delivered_once() {
        let source: Arc<dyn MarketDataSource> = Arc::new(FallingSource { delay: Duration::ZERO });
        let mut handle =
            ScanWorker::spawn(source, ScannerConfig::default(), Market::Kospi, ScanPeriod::OneWeek).unwrap();

        let report = wait_for(&mut handle);
        assert_eq!(report.market, Some(Market::Kospi));
        assert_eq!(report.decliners.len(), 2);
        assert_eq!(report.decliners[0].change_percent, -10.0);

        // Plus rien après la livraison
        assert!(handle.result_rx.try_recv().is_err());
    }

    #[test]
    fn test_shutdown_cancels_slow_scan() {
        let source: Arc<dyn MarketDataSource> = Arc::new(FallingSource {
            delay: Duration::from_secs(60),
        });
        let handle =
            ScanWorker::spawn(source, ScannerConfig::default(), Market::Kosdaq, ScanPeriod::OneDay).unwrap();

        let started = Instant::now();
        handle.shutdown();
        assert!(started.elapsed() < Duration::from_secs(30));
    }
}
