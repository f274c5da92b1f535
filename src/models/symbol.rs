// ============================================================================
// Structure : Symbol
// ============================================================================
// Représente un instrument négociable sur un marché : (nom, code)
//
// CONCEPTS RUST :
// 1. String vs &str :
//    - String : owned string (possède la mémoire, heap allocated)
//    - &str : borrowed string slice (référence, ne possède pas)
//    - On utilise String ici car le Symbol possède ses données
//
// 2. Option<String> : le code standard KRX (ISIN) n'existe que pour
//    les symboles domestiques listés via le service KRX
// ============================================================================

use serde::{Deserialize, Serialize};

/// Symbole boursier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Nom affiché (ex: "삼성전자", "Apple Inc. - Common Stock")
    pub name: String,

    /// Code du ticker (ex: "005930", "AAPL")
    pub code: String,

    /// Code standard KRX (ex: "KR7005930003"), requis pour l'historique domestique
    pub standard_code: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            standard_code: None,
        }
    }

    /// Symbole domestique avec son code standard déjà connu
    pub fn with_standard_code(
        name: impl Into<String>,
        code: impl Into<String>,
        standard_code: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            standard_code: Some(standard_code.into()),
        }
    }

    /// Formatte le symbole : "Nom (CODE)"
    ///
    /// C'est aussi le jeton stocké dans la watchlist
    pub fn display(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }

    /// Reconstruit un symbole depuis sa forme affichée "Nom (CODE)"
    ///
    /// CONCEPT RUST : rsplit_once
    /// - Coupe à la DERNIÈRE parenthèse ouvrante
    /// - Les noms contenant des parenthèses restent intacts
    ///   (ex: "Foo (Class A) (FOO)" → nom "Foo (Class A)", code "FOO")
    pub fn from_display(entry: &str) -> Option<Symbol> {
        let entry = entry.trim();
        let without_close = entry.strip_suffix(')')?;
        let (name, code) = without_close.rsplit_once(" (")?;

        if code.is_empty() || code.contains(' ') {
            return None;
        }

        Some(Symbol::new(name.trim(), code))
    }

    /// Vrai si le code ne contient que des lettres majuscules A–Z
    ///
    /// Exclut les warrants, units et classes d'actions (ex: "BRK.B", "ACAHW$")
    pub fn is_plain_ticker(&self) -> bool {
        !self.code.is_empty() && self.code.chars().all(|c| c.is_ascii_uppercase())
    }

    /// Recherche insensible à la casse sur le nom et le code
    pub fn matches(&self, filter: &str) -> bool {
        if filter.is_empty() {
            return true;
        }
        let needle = filter.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.code.to_lowercase().contains(&needle)
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_display() {
        let symbol = Symbol::new("Apple Inc.", "AAPL");
        assert_eq!(symbol.display(), "Apple Inc. (AAPL)");
    }

    #[test]
    fn test_from_display() {
        let symbol = Symbol::from_display("삼성전자 (005930)").unwrap();
        assert_eq!(symbol.name, "삼성전자");
        assert_eq!(symbol.code, "005930");

        let nested = Symbol::from_display("Foo (Class A) (FOO)").unwrap();
        assert_eq!(nested.name, "Foo (Class A)");
        assert_eq!(nested.code, "FOO");

        assert!(Symbol::from_display("pas de code").is_none());
        assert!(Symbol::from_display("Vide ()").is_none());
    }

    #[test]
    fn test_plain_ticker() {
        assert!(Symbol::new("Apple", "AAPL").is_plain_ticker());
        assert!(!Symbol::new("Berkshire", "BRK.B").is_plain_ticker());
        assert!(!Symbol::new("Warrant", "ACAHW$").is_plain_ticker());
        assert!(!Symbol::new("Lower", "aapl").is_plain_ticker());
        assert!(!Symbol::new("Samsung", "005930").is_plain_ticker());
    }

    #[test]
    fn test_matches_filter() {
        let symbol = Symbol::new("Apple Inc.", "AAPL");
        assert!(symbol.matches(""));
        assert!(symbol.matches("apple"));
        assert!(symbol.matches("aap"));
        assert!(!symbol.matches("tesla"));
    }
}
