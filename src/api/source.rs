// ============================================================================
// MarketDataSource : interface commune d'accès aux données
// ============================================================================
// Le scanner et l'UI ne connaissent que ce trait ; MarketData route chaque
// appel vers KRX (marchés domestiques) ou Yahoo + CSV (marchés globaux)
//
// CONCEPT RUST : async-trait
// - Les fonctions async dans un trait objet (dyn) passent par #[async_trait]
// - Send + Sync : le trait peut être partagé avec le thread du scanner (Arc)
// ============================================================================

use async_trait::async_trait;
use tracing::instrument;

use crate::api::krx::KrxClient;
use crate::api::listing::{filter_plain_tickers, load_listing};
use crate::api::yahoo::YahooClient;
use crate::config::ListingsConfig;
use crate::error::{DataError, Result};
use crate::models::{DateRange, Market, OHLCData, Source, Symbol};

/// Source de données de marché
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Tous les symboles négociables sur `market` aujourd'hui
    async fn list_symbols(&self, market: Market) -> Result<Vec<Symbol>>;

    /// Série OHLCV journalière d'un symbole
    ///
    /// Une série vide ou d'une seule séance est un Ok valide
    async fn fetch_ohlcv(&self, market: Market, symbol: &Symbol, range: DateRange) -> Result<OHLCData>;
}

/// Implémentation de production : KRX + Yahoo + fichiers de cotation
pub struct MarketData {
    krx: KrxClient,
    yahoo: YahooClient,
    listings: ListingsConfig,
}

impl MarketData {
    pub fn new(listings: ListingsConfig) -> Result<Self> {
        Ok(Self {
            krx: KrxClient::new()?,
            yahoo: YahooClient::new()?,
            listings,
        })
    }

    /// Copie avec des clients HTTP neufs, pour un autre runtime tokio
    ///
    /// Les connexions du pool reqwest sont liées au runtime qui les a
    /// ouvertes : un scan sur son propre runtime ne partage pas le pool du
    /// thread principal
    pub fn detached(&self) -> Result<Self> {
        Self::new(self.listings.clone())
    }
}

#[async_trait]
impl MarketDataSource for MarketData {
    #[instrument(skip(self))]
    async fn list_symbols(&self, market: Market) -> Result<Vec<Symbol>> {
        match market.source() {
            Source::Domestic => self.krx.list_symbols(market).await,
            Source::Global => {
                let path = self
                    .listings
                    .path_for(market)
                    .ok_or_else(|| DataError::Parse(format!("Pas de fichier pour {}", market)))?;
                let symbols = load_listing(path, market)?;
                Ok(filter_plain_tickers(symbols))
            }
        }
    }

    async fn fetch_ohlcv(&self, market: Market, symbol: &Symbol, range: DateRange) -> Result<OHLCData> {
        match market.source() {
            Source::Domestic => self.krx.fetch_daily(symbol, range).await,
            Source::Global => self.yahoo.fetch_daily(&symbol.code, range).await,
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
