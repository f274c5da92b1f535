// ============================================================================
// Enum : Market
// ============================================================================
// Les quatre marchés supportés et la source de données qui les sert
//
// CONCEPTS RUST :
// 1. Enum Copy : petite valeur copiée sans allocation
// 2. FromStr : parsing idiomatique depuis un label ("KOSPI", "nyse", ...)
// 3. Display : affichage du label dans l'UI et les logs
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Famille de source de données
///
/// - Domestic : service KRX (codes à 6 chiffres)
/// - Global : Yahoo Finance + fichiers de cotation CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Domestic,
    Global,
}

/// Marché boursier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    Kospi,
    Kosdaq,
    Nyse,
    Nasdaq,
}

impl Market {
    /// Tous les marchés, dans l'ordre des onglets
    pub const ALL: [Market; 4] = [Market::Kospi, Market::Kosdaq, Market::Nyse, Market::Nasdaq];

    /// Label affiché (identique au label accepté par FromStr)
    pub fn label(&self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
            Market::Nyse => "NYSE",
            Market::Nasdaq => "NASDAQ",
        }
    }

    /// Source de données qui sert ce marché
    pub fn source(&self) -> Source {
        match self {
            Market::Kospi | Market::Kosdaq => Source::Domestic,
            Market::Nyse | Market::Nasdaq => Source::Global,
        }
    }

    /// Identifiant de marché utilisé par le service KRX (mktId)
    ///
    /// None pour les marchés globaux
    pub fn krx_id(&self) -> Option<&'static str> {
        match self {
            Market::Kospi => Some("STK"),
            Market::Kosdaq => Some("KSQ"),
            Market::Nyse | Market::Nasdaq => None,
        }
    }

    /// Devine le marché d'un code isolé (entrée de watchlist)
    ///
    /// Un code KRX fait 6 caractères alphanumériques et commence par un
    /// chiffre (005930, 00104K pour une action préférentielle) ; le reste
    /// est global.
    /// KOSPI/KOSDAQ et NYSE/NASDAQ partagent la même source, donc le choix
    /// à l'intérieur d'une famille n'a pas d'effet sur le fetch.
    pub fn infer_from_code(code: &str) -> Market {
        let krx_like = code.len() == 6
            && code.starts_with(|c: char| c.is_ascii_digit())
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if krx_like {
            Market::Kospi
        } else {
            Market::Nyse
        }
    }

    /// Index de l'onglet (0..4)
    pub fn index(&self) -> usize {
        Market::ALL.iter().position(|m| m == self).unwrap_or(0)
    }
}

impl Default for Market {
    fn default() -> Self {
        Market::Kospi
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Market {
    type Err = String;

    /// CONCEPT RUST : FromStr
    /// - Permet "NYSE".parse::<Market>()
    /// - Insensible à la casse, espaces ignorés
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KOSPI" => Ok(Market::Kospi),
            "KOSDAQ" => Ok(Market::Kosdaq),
            "NYSE" => Ok(Market::Nyse),
            "NASDAQ" => Ok(Market::Nasdaq),
            other => Err(format!("Marché inconnu : {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_market() {
        assert_eq!("kospi".parse::<Market>(), Ok(Market::Kospi));
        assert_eq!(" NASDAQ ".parse::<Market>(), Ok(Market::Nasdaq));
        assert!("TSX".parse::<Market>().is_err());
    }

    #[test]
    fn test_market_source() {
        assert_eq!(Market::Kosdaq.source(), Source::Domestic);
        assert_eq!(Market::Nyse.source(), Source::Global);
        assert_eq!(Market::Kospi.krx_id(), Some("STK"));
        assert_eq!(Market::Nasdaq.krx_id(), None);
    }

    #[test]
    fn test_tab_index() {
        assert_eq!(Market::Kospi.index(), 0);
        assert_eq!(Market::Nasdaq.index(), 3);
    }

    #[test]
    fn test_infer_from_code() {
        assert_eq!(Market::infer_from_code("005930"), Market::Kospi);
        assert_eq!(Market::infer_from_code("AAPL"), Market::Nyse);
        assert_eq!(Market::infer_from_code("12345"), Market::Nyse);

        // Actions préférentielles : code alphanumérique
        assert_eq!(Market::infer_from_code("00104K").source(), Source::Domestic);
        assert_eq!(Market::infer_from_code("GOOGLE").source(), Source::Global);
    }
}
