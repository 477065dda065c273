//! Credential files: `privateKeys.json` and `accounts.json`.
//!
//! Both are JSON arrays of strings, in account order. Anything else
//! (missing file, bad JSON, non-array, empty array) is a startup error.

use crate::error::{OdysseyError, OdysseyResult};
use std::path::Path;
use std::str::FromStr;

/// Which secret format a credential file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    /// Base58-encoded 64-byte secret keys.
    PrivateKey,
    /// BIP-39 mnemonics.
    SeedPhrase,
}

impl FromStr for CredentialKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "key" | "private-key" | "1" => Ok(Self::PrivateKey),
            "seed" | "seed-phrase" | "0" => Ok(Self::SeedPhrase),
            _ => Err(format!("Unknown input method: {s} (expected 'seed' or 'key')")),
        }
    }
}

/// One account's secret.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    PrivateKey(String),
    SeedPhrase(String),
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::PrivateKey(_) => f.write_str("PrivateKey(..)"),
            Credential::SeedPhrase(_) => f.write_str("SeedPhrase(..)"),
        }
    }
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        match self {
            Credential::PrivateKey(_) => CredentialKind::PrivateKey,
            Credential::SeedPhrase(_) => CredentialKind::SeedPhrase,
        }
    }
}

/// Read a credential file of the given kind.
pub fn load_credentials(path: &Path, kind: CredentialKind) -> OdysseyResult<Vec<Credential>> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        OdysseyError::CredentialFile(format!("cannot read {}: {e}", path.display()))
    })?;
    parse_credentials(&data, kind)
        .map_err(|msg| OdysseyError::CredentialFile(format!("{}: {msg}", path.display())))
}

fn parse_credentials(data: &str, kind: CredentialKind) -> Result<Vec<Credential>, String> {
    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| format!("not valid JSON ({e})"))?;
    let items = value
        .as_array()
        .ok_or_else(|| "is not set correctly (expected a JSON array)".to_string())?;
    if items.is_empty() {
        return Err("is empty".into());
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let secret = item
                .as_str()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| format!("entry {} is not a non-empty string", i + 1))?;
            Ok(match kind {
                CredentialKind::PrivateKey => Credential::PrivateKey(secret.to_string()),
                CredentialKind::SeedPhrase => Credential::SeedPhrase(secret.to_string()),
            })
        })
        .collect()
}
