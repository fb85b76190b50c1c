//! Offline evaluation of the signal strategy over recorded spins.

pub mod replay;

use anyhow::{Context, Result};
use std::path::Path;

use crate::types::Outcome;

/// Load a chronological (oldest-first) JSON array of spins, e.g. `[17, 4, 0]`.
pub fn load_spins(path: impl AsRef<Path>) -> Result<Vec<Outcome>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read spins from {}", path.display()))?;
    let spins: Vec<Outcome> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse spins from {}", path.display()))?;
    Ok(spins)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("serpent_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_load_spins() {
        let path = temp_path("spins_ok");
        std::fs::write(&path, "[17, 4, 0, 36]").unwrap();
        let spins = load_spins(&path).unwrap();
        let values: Vec<u8> = spins.iter().map(|o| o.value()).collect();
        assert_eq!(values, vec![17, 4, 0, 36]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_spins_rejects_out_of_range() {
        let path = temp_path("spins_bad");
        std::fs::write(&path, "[1, 99]").unwrap();
        assert!(load_spins(&path).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_spins_missing_file() {
        assert!(load_spins("/tmp/serpent_does_not_exist_xyz.json").is_err());
    }
}
