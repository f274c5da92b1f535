// ============================================================================
// Structure : Watchlist
// ============================================================================
// Liste de symboles favoris, persistée dans un fichier JSON
//
// Format du fichier : un seul tableau de chaînes
//   ["삼성전자 (005930)", "Apple Inc. (AAPL)"]
//
// RÈGLES :
// - Lue une fois au démarrage
// - Réécrite en entier après chaque ajout / suppression effectif
// - Unicité par égalité exacte de la chaîne
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;

/// Watchlist persistée
#[derive(Debug, Clone)]
pub struct Watchlist {
    path: PathBuf,
    entries: Vec<String>,
}

impl Watchlist {
    /// Watchlist vide associée à un fichier (rien n'est écrit)
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Charge la watchlist depuis le disque
    ///
    /// Fichier absent → watchlist vide ; JSON invalide → erreur
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(?path, "No watchlist file yet");
            return Ok(Self::empty(path));
        }

        let contents = fs::read_to_string(&path)?;
        let entries: Vec<String> = serde_json::from_str(&contents)?;
        info!(?path, count = entries.len(), "Watchlist loaded");
        Ok(Self { path, entries })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// Ajoute une entrée et persiste
    ///
    /// Retourne Ok(false) sans écrire si l'entrée existe déjà.
    /// Si l'écriture échoue, la liste en mémoire reste inchangée.
    pub fn add(&mut self, entry: &str) -> Result<bool> {
        if self.contains(entry) {
            debug!(entry, "Already in watchlist");
            return Ok(false);
        }

        let mut entries = self.entries.clone();
        entries.push(entry.to_string());
        self.commit(entries)?;
        info!(entry, "Added to watchlist");
        Ok(true)
    }

    /// Supprime une entrée et persiste
    ///
    /// Retourne Ok(false) sans écrire si l'entrée est absente
    pub fn remove(&mut self, entry: &str) -> Result<bool> {
        let index = match self.entries.iter().position(|e| e == entry) {
            Some(index) => index,
            None => return Ok(false),
        };

        let mut entries = self.entries.clone();
        entries.remove(index);
        self.commit(entries)?;
        info!(entry, "Removed from watchlist");
        Ok(true)
    }

    /// Écrit la nouvelle liste puis la garde en mémoire
    ///
    /// CONCEPT RUST : ownership
    /// - `entries` est "moved" dans self seulement après un save réussi
    /// - Sur Err, `?` retourne avant l'affectation : mémoire = disque
    fn commit(&mut self, entries: Vec<String>) -> Result<()> {
        Self::save(&self.path, &entries)?;
        self.entries = entries;
        Ok(())
    }

    /// Réécrit le fichier en entier (crée le répertoire parent au besoin)
    fn save(path: &Path, entries: &[String]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(path, json)?;
        Ok(())
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(path: &Path) -> Vec<String> {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let watchlist = Watchlist::load(dir.path().join("watchlist.json")).unwrap();
        assert!(watchlist.is_empty());
    }

    #[test]
    fn test_add_twice_keeps_one_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let mut watchlist = Watchlist::load(&path).unwrap();

        assert!(watchlist.add("Apple Inc. (AAPL)").unwrap());
        assert!(!watchlist.add("Apple Inc. (AAPL)").unwrap());

        assert_eq!(watchlist.len(), 1);
        assert_eq!(stored(&path), vec!["Apple Inc. (AAPL)".to_string()]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let mut watchlist = Watchlist::load(&path).unwrap();
        watchlist.add("삼성전자 (005930)").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(!watchlist.remove("Tesla (TSLA)").unwrap());

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(watchlist.len(), 1);
    }

    #[test]
    fn test_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("watchlist.json");
        let mut watchlist = Watchlist::load(&path).unwrap();
        watchlist.add("A (A)").unwrap();
        watchlist.add("B (B)").unwrap();

        assert!(watchlist.remove("A (A)").unwrap());

        let reloaded = Watchlist::load(&path).unwrap();
        assert_eq!(reloaded.entries(), &["B (B)".to_string()]);
    }

    #[test]
    fn test_failed_save_leaves_list_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // Le répertoire parent est un fichier : create_dir_all échoue
        let blocker = dir.path().join("data");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("watchlist.json");
        let mut watchlist = Watchlist::empty(path.clone());

        assert!(watchlist.add("Apple Inc. (AAPL)").is_err());
        assert!(watchlist.is_empty());
        assert!(!path.exists());

        // Nouvel essai : toujours une erreur, pas un faux "déjà présent"
        assert!(watchlist.add("Apple Inc. (AAPL)").is_err());
        assert!(watchlist.is_empty());
    }

    #[test]
    fn test_failed_remove_keeps_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        let mut watchlist = Watchlist::load(&path).unwrap();
        watchlist.add("A (A)").unwrap();

        // Le fichier devient un répertoire : fs::write échoue
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(watchlist.remove("A (A)").is_err());
        assert!(watchlist.contains("A (A)"));
    }

    #[test]
    fn test_invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Watchlist::load(&path).is_err());
    }
}
