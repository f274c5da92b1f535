// ============================================================================
// API Client : KRX (Korea Exchange) data portal
// ============================================================================
// Liste des symboles KOSPI / KOSDAQ et historique journalier domestique
//
// Le portail expose un seul endpoint POST ; le "bld" choisit l'écran :
//   - MDCSTAT01901    : informations de base de tous les titres d'un marché
//   - MDCSTAT01701    : historique d'un titre (par code standard)
//   - finder_stkisu   : recherche d'un titre (code court → code standard)
//
// Les nombres arrivent formatés ("72,700"), "-" pour une valeur absente.
// ============================================================================

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{DataError, Result};
use crate::models::{DateRange, Market, OHLCData, Symbol, OHLC};

const BASE_URL: &str = "http://data.krx.co.kr";
const JSON_PATH: &str = "/comm/bldAttendant/getJsonData.cmd";

/// Le portail refuse les requêtes sans Referer de ses propres pages
const REFERER: &str = "http://data.krx.co.kr/contents/MDC/MDI/mdiLoader";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const BLD_LISTING: &str = "dbms/MDC/STAT/standard/MDCSTAT01901";
const BLD_HISTORY: &str = "dbms/MDC/STAT/standard/MDCSTAT01701";
const BLD_FINDER: &str = "dbms/comm/finder/finder_stkisu";

// ============================================================================
// Structures JSON
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(rename = "OutBlock_1", default)]
    rows: Vec<ListingRow>,
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    /// Code standard (ex: "KR7005930003")
    #[serde(rename = "ISU_CD")]
    standard_code: String,
    /// Code court (ex: "005930")
    #[serde(rename = "ISU_SRT_CD")]
    short_code: String,
    /// Nom abrégé (ex: "삼성전자")
    #[serde(rename = "ISU_ABBRV")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    output: Vec<HistoryRow>,
}

/// Une séance telle que renvoyée par le portail
///
/// Tous les champs sont des chaînes formatées ; un champ absent ou "-"
/// rend la valeur inutilisable
#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "TRD_DD")]
    date: String,
    #[serde(rename = "TDD_OPNPRC", default)]
    open: String,
    #[serde(rename = "TDD_HGPRC", default)]
    high: String,
    #[serde(rename = "TDD_LWPRC", default)]
    low: String,
    #[serde(rename = "TDD_CLSPRC", default)]
    close: String,
    #[serde(rename = "ACC_TRDVOL", default)]
    volume: String,
}

#[derive(Debug, Deserialize)]
struct FinderResponse {
    #[serde(default)]
    block1: Vec<FinderRow>,
}

#[derive(Debug, Deserialize)]
struct FinderRow {
    full_code: String,
    short_code: String,
}

// ============================================================================
// Client
// ============================================================================

/// Client du portail de données KRX
#[derive(Debug, Clone)]
pub struct KrxClient {
    http: reqwest::Client,
    base_url: String,
}

impl KrxClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

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

    /// Envoie un formulaire au endpoint JSON et désérialise la réponse
    ///
    /// CONCEPT RUST : Générique avec trait bound
    /// - T: DeserializeOwned → n'importe quelle structure serde possédée
    async fn post_form<T: serde::de::DeserializeOwned>(&self, form: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, JSON_PATH);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::REFERER, REFERER)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status {
                service: "KRX",
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Liste tous les titres d'un marché domestique
    #[instrument(skip(self))]
    pub async fn list_symbols(&self, market: Market) -> Result<Vec<Symbol>> {
        let market_id = market
            .krx_id()
            .ok_or_else(|| DataError::Parse(format!("{} n'est pas un marché KRX", market)))?;

        let response: ListingResponse = self
            .post_form(&[
                ("bld", BLD_LISTING),
                ("mktId", market_id),
                ("share", "1"),
                ("csvxls_isNo", "false"),
            ])
            .await?;

        let symbols: Vec<Symbol> = response
            .rows
            .into_iter()
            .map(|row| Symbol::with_standard_code(row.name, row.short_code, row.standard_code))
            .collect();

        debug!(count = symbols.len(), "KRX listing fetched");
        Ok(symbols)
    }

    /// Résout le code standard d'un code court via la recherche du portail
    #[instrument(skip(self))]
    pub async fn resolve_standard_code(&self, short_code: &str) -> Result<String> {
        let response: FinderResponse = self
            .post_form(&[
                ("bld", BLD_FINDER),
                ("mktsel", "ALL"),
                ("typeNo", "0"),
                ("searchText", short_code),
            ])
            .await?;

        response
            .block1
            .into_iter()
            .find(|row| row.short_code == short_code)
            .map(|row| row.full_code)
            .ok_or_else(|| DataError::UnknownSymbol(short_code.to_string()))
    }

    /// Historique journalier ajusté d'un titre
    ///
    /// Une série vide (jour férié, titre suspendu) est un résultat valide
    #[instrument(skip(self, symbol, range), fields(code = %symbol.code))]
    pub async fn fetch_daily(&self, symbol: &Symbol, range: DateRange) -> Result<OHLCData> {
        let standard_code = match &symbol.standard_code {
            Some(code) => code.clone(),
            None => self.resolve_standard_code(&symbol.code).await?,
        };

        let start = range.start_compact();
        let end = range.end_compact();
        let response: HistoryResponse = self
            .post_form(&[
                ("bld", BLD_HISTORY),
                ("isuCd", standard_code.as_str()),
                ("strtDd", start.as_str()),
                ("endDd", end.as_str()),
                ("adjStkPrc", "2"),
                ("share", "1"),
                ("money", "1"),
                ("csvxls_isNo", "false"),
            ])
            .await?;

        Ok(parse_history(response, &symbol.code, range))
    }
}

/// Convertit les lignes KRX en OHLCData triée par date croissante
///
/// Une ligne sans clôture exploitable est ignorée ; open/high/low absents
/// retombent sur la clôture
fn parse_history(response: HistoryResponse, code: &str, range: DateRange) -> OHLCData {
    let mut data = OHLCData::new(code.to_string(), range);
    let total = response.output.len();

    for row in response.output {
        let date = match NaiveDate::parse_from_str(&row.date, "%Y/%m/%d") {
            Ok(date) => date,
            Err(_) => continue,
        };
        let close = match parse_number(&row.close) {
            Some(close) => close,
            None => continue,
        };
        let open = parse_number(&row.open).unwrap_or(close);
        let high = parse_number(&row.high).unwrap_or(close);
        let low = parse_number(&row.low).unwrap_or(close);
        let volume = parse_number(&row.volume).map(|v| v as u64).unwrap_or(0);

        data.add_candle(OHLC::on_date(date, open, high, low, close, volume));
    }

    if data.len() < total {
        warn!(kept = data.len(), total, "Dropped KRX rows without usable close");
    }

    data.sort_chronologically();
    data
}

/// Parse un nombre formaté KRX ("72,700", "-", "")
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 29).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("72,700"), Some(72700.0));
        assert_eq!(parse_number("15,703,560"), Some(15703560.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_parse_listing() {
        let response: ListingResponse = serde_json::from_str(
            r#"{"OutBlock_1":[
                {"ISU_CD":"KR7005930003","ISU_SRT_CD":"005930","ISU_NM":"삼성전자보통주","ISU_ABBRV":"삼성전자"},
                {"ISU_CD":"KR7000660001","ISU_SRT_CD":"000660","ISU_NM":"SK하이닉스보통주","ISU_ABBRV":"SK하이닉스"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(response.rows.len(), 2);
        assert_eq!(response.rows[0].short_code, "005930");
        assert_eq!(response.rows[1].name, "SK하이닉스");
    }

    #[test]
    fn test_parse_history_newest_first() {
        let response: HistoryResponse = serde_json::from_str(
            r#"{"output":[
                {"TRD_DD":"2024/01/31","TDD_CLSPRC":"72,700","TDD_OPNPRC":"73,400","TDD_HGPRC":"74,000","TDD_LWPRC":"72,500","ACC_TRDVOL":"15,703,560"},
                {"TRD_DD":"2024/01/30","TDD_CLSPRC":"-","TDD_OPNPRC":"-","TDD_HGPRC":"-","TDD_LWPRC":"-","ACC_TRDVOL":"0"},
                {"TRD_DD":"2024/01/29","TDD_CLSPRC":"74,400","TDD_OPNPRC":"73,800","TDD_HGPRC":"75,200","TDD_LWPRC":"73,500","ACC_TRDVOL":"12,000,000"}
            ]}"#,
        )
        .unwrap();

        let data = parse_history(response, "005930", range());
        assert_eq!(data.len(), 2);
        // Réordonné du plus ancien au plus récent
        assert_eq!(data.first().unwrap().close, 74400.0);
        assert_eq!(data.last().unwrap().close, 72700.0);
        assert_eq!(data.last().unwrap().volume, 15_703_560);
    }

    #[test]
    fn test_parse_history_empty() {
        let response: HistoryResponse = serde_json::from_str(r#"{}"#).unwrap();
        let data = parse_history(response, "005930", range());
        assert!(data.is_empty());
    }

    #[test]
    fn test_parse_finder() {
        let response: FinderResponse = serde_json::from_str(
            r#"{"block1":[{"full_code":"KR7005930003","short_code":"005930","codeName":"삼성전자"}]}"#,
        )
        .unwrap();
        assert_eq!(response.block1[0].full_code, "KR7005930003");
    }

    #[tokio::test]
    async fn test_list_symbols_rejects_global_market() {
        let client = KrxClient::new().unwrap();
        let err = client.list_symbols(Market::Nyse).await.unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }
}
