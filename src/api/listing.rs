// ============================================================================
// Listing : fichiers de cotation NYSE / NASDAQ
// ============================================================================
// Les marchés globaux n'ont pas de service de liste : on lit deux fichiers
// CSV de référence (un par marché) avec des noms de colonnes différents
//
//   nyse-listed.csv   : "ACT Symbol", "Company Name"
//   nasdaq-listed.csv : "Symbol",     "Security Name"
// ============================================================================

use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::{DataError, Result};
use crate::models::{Market, Symbol};

/// Colonnes (code, nom) du fichier de cotation d'un marché global
fn columns_for(market: Market) -> Option<(&'static str, &'static str)> {
    match market {
        Market::Nyse => Some(("ACT Symbol", "Company Name")),
        Market::Nasdaq => Some(("Symbol", "Security Name")),
        Market::Kospi | Market::Kosdaq => None,
    }
}

/// Lit toutes les lignes d'un fichier de cotation
///
/// Aucune filtration ici : voir `filter_plain_tickers`
///
/// # Erreurs
/// * `MissingListing` si le fichier n'existe pas
/// * `MissingColumn` si l'en-tête n'a pas les colonnes attendues
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_listing(path: &Path, market: Market) -> Result<Vec<Symbol>> {
    let (code_col, name_col) = columns_for(market)
        .ok_or_else(|| DataError::Parse(format!("{} n'a pas de fichier de cotation", market)))?;

    if !path.exists() {
        warn!("Listing file not found");
        return Err(DataError::MissingListing {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    // CONCEPT RUST : position() sur un itérateur
    // - Trouve l'index de la colonne par son nom, une seule fois
    let headers = reader.headers()?.clone();
    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| DataError::MissingColumn {
                file: path.display().to_string(),
                column: column.to_string(),
            })
    };
    let code_idx = find(code_col)?;
    let name_idx = find(name_col)?;

    let mut symbols = Vec::new();
    for record in reader.records() {
        let record = record?;
        let code = record.get(code_idx).unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        let name = record.get(name_idx).unwrap_or("").trim();
        symbols.push(Symbol::new(name, code));
    }

    debug!(count = symbols.len(), "Listing loaded");
    Ok(symbols)
}

/// Garde uniquement les codes composés de lettres A–Z
///
/// Politique explicite : exclut warrants, units et classes (ex: "BRK.B")
pub fn filter_plain_tickers(symbols: Vec<Symbol>) -> Vec<Symbol> {
    symbols.into_iter().filter(Symbol::is_plain_ticker).collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_nyse_listing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nyse-listed.csv");
        fs::write(
            &path,
            "ACT Symbol,Company Name\nA,Agilent Technologies\nBRK.B,Berkshire Hathaway Class B\n",
        )
        .unwrap();

        let symbols = load_listing(&path, Market::Nyse).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0], Symbol::new("Agilent Technologies", "A"));
        assert_eq!(symbols[1].code, "BRK.B");
    }

    #[test]
    fn test_load_nasdaq_listing_with_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nasdaq-listed.csv");
        fs::write(
            &path,
            "Symbol,Security Name,Market Category,Test Issue\n\
             AAPL,Apple Inc. - Common Stock,Q,N\n\
             \"MSFT\",\"Microsoft Corporation - Common Stock\",Q,N\n",
        )
        .unwrap();

        let symbols = load_listing(&path, Market::Nasdaq).unwrap();
        let codes: Vec<&str> = symbols.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_missing_listing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nyse-listed.csv");

        let err = load_listing(&path, Market::Nyse).unwrap_err();
        assert!(matches!(err, DataError::MissingListing { .. }));
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nyse-listed.csv");
        fs::write(&path, "Ticker,Name\nAAPL,Apple\n").unwrap();

        let err = load_listing(&path, Market::Nyse).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { ref column, .. } if column == "ACT Symbol"));
    }

    #[test]
    fn test_filter_plain_tickers() {
        let symbols = vec![
            Symbol::new("Berkshire Hathaway Class B", "BRK.B"),
            Symbol::new("Apple Inc.", "AAPL"),
            Symbol::new("Some Units", "ABCU="),
        ];
        let kept = filter_plain_tickers(symbols);
        assert_eq!(kept, vec![Symbol::new("Apple Inc.", "AAPL")]);
    }
}
