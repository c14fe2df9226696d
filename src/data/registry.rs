//! Label -> FRED series identifier registry.
//!
//! The registry is configuration, not computed data. It is versioned so a
//! registry file can be traced back to the mapping it encodes, and it is
//! validated on construction: two labels pointing at one upstream series is
//! a configuration error, not something to paper over at merge time.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a series participates in the derived views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesRole {
    /// Denominator for composition percentages.
    Total,
    /// Regular balance sheet line item.
    Component,
    /// Usage signals market stress (liquidity swaps, credit facility loans).
    Stress,
    /// Foreign official sector activity.
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub label: String,
    pub series_id: String,
    pub role: SeriesRole,
    #[serde(default)]
    pub description: String,
}

impl SeriesEntry {
    fn builtin(label: &str, series_id: &str, role: SeriesRole, description: &str) -> Self {
        Self {
            label: label.to_string(),
            series_id: series_id.to_string(),
            role,
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("registry has no entries")]
    Empty,

    #[error("entry #{index} has an empty label or series id")]
    BlankEntry { index: usize },

    #[error("label '{label}' appears more than once")]
    DuplicateLabel { label: String },

    #[error("series id '{series_id}' is mapped by both '{first}' and '{second}'")]
    IdCollision {
        series_id: String,
        first: String,
        second: String,
    },

    #[error("both '{first}' and '{second}' are marked as the total")]
    MultipleTotals { first: String, second: String },

    #[error("failed to read registry file '{path}': {message}")]
    Io { path: String, message: String },
}

/// On-disk registry format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryFile {
    version: u32,
    series: Vec<SeriesEntry>,
}

/// A validated label -> series id mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRegistry {
    version: u32,
    entries: Vec<SeriesEntry>,
}

impl SeriesRegistry {
    pub const BUILTIN_VERSION: u32 = 2;

    pub fn new(version: u32, mut entries: Vec<SeriesEntry>) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::Empty);
        }
        for entry in &mut entries {
            entry.label = entry.label.trim().to_string();
            entry.series_id = entry.series_id.trim().to_string();
        }

        let mut labels: HashSet<&str> = HashSet::new();
        let mut ids: HashMap<&str, &str> = HashMap::new();
        let mut total: Option<&str> = None;

        for (index, entry) in entries.iter().enumerate() {
            let label = entry.label.as_str();
            let series_id = entry.series_id.as_str();
            if label.is_empty() || series_id.is_empty() {
                return Err(RegistryError::BlankEntry { index });
            }
            if !labels.insert(label) {
                return Err(RegistryError::DuplicateLabel {
                    label: label.to_string(),
                });
            }
            if let Some(first) = ids.insert(series_id, label) {
                return Err(RegistryError::IdCollision {
                    series_id: series_id.to_string(),
                    first: first.to_string(),
                    second: label.to_string(),
                });
            }
            if entry.role == SeriesRole::Total {
                if let Some(first) = total {
                    return Err(RegistryError::MultipleTotals {
                        first: first.to_string(),
                        second: label.to_string(),
                    });
                }
                total = Some(label);
            }
        }

        Ok(Self { version, entries })
    }

    /// The H.4.1 series shipped with the dashboard.
    pub fn builtin() -> Self {
        use SeriesRole::*;
        let entries = vec![
            SeriesEntry::builtin(
                "Total Assets",
                "WALCL",
                Total,
                "Assets: Total Assets: Total Assets (Less Eliminations from Consolidation): Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Treasury Securities",
                "TREAST",
                Component,
                "Assets: Securities Held Outright: U.S. Treasury Securities: All: Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Mortgage-Backed Securities",
                "WSHOMCB",
                Component,
                "Assets: Securities Held Outright: Mortgage-Backed Securities: Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Bank Reserves",
                "WRESBAL",
                Component,
                "Liabilities: Reserve Balances with Federal Reserve Banks: Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Reverse Repo Foreign",
                "WLRRAFOIAL",
                Foreign,
                "Liabilities: Reverse Repurchase Agreements: Foreign Official and International Accounts: Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Central Bank Liquidity Swaps",
                "SWPT",
                Stress,
                "Assets: Central Bank Liquidity Swaps: Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Loans",
                "WLCFLL",
                Stress,
                "Assets: Liquidity and Credit Facilities: Loans: Wednesday Level",
            ),
            SeriesEntry::builtin(
                "Securities in Custody",
                "WFCDA",
                Foreign,
                "Securities held in custody for foreign official and international accounts",
            ),
        ];
        // The literal above is checked by `builtin_registry_is_valid`.
        Self {
            version: Self::BUILTIN_VERSION,
            entries,
        }
    }

    /// Load and validate a JSON registry file (`{"version": N, "series": [...]}`).
    pub fn from_json_file(path: &Path) -> Result<Self, RegistryError> {
        let io_err = |message: String| RegistryError::Io {
            path: path.display().to_string(),
            message,
        };
        let file = File::open(path).map_err(|e| io_err(e.to_string()))?;
        let parsed: RegistryFile = serde_json::from_reader(file).map_err(|e| io_err(e.to_string()))?;
        Self::new(parsed.version, parsed.series)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn entries(&self) -> &[SeriesEntry] {
        &self.entries
    }

    pub fn by_label(&self, label: &str) -> Option<&SeriesEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    pub fn by_series_id(&self, series_id: &str) -> Option<&SeriesEntry> {
        self.entries.iter().find(|e| e.series_id == series_id)
    }

    /// Registry position of a label (used to order display columns).
    pub fn position(&self, label: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.label == label)
    }

    pub fn total(&self) -> Option<&SeriesEntry> {
        self.entries.iter().find(|e| e.role == SeriesRole::Total)
    }

    pub fn labels_with_role(&self, role: SeriesRole) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.role == role)
            .map(|e| e.label.as_str())
            .collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }
}

/// Labels selected when the user does not pick any.
pub const DEFAULT_SELECTION: [&str; 6] = [
    "Total Assets",
    "Treasury Securities",
    "Mortgage-Backed Securities",
    "Bank Reserves",
    "Loans",
    "Reverse Repo Foreign",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, id: &str, role: SeriesRole) -> SeriesEntry {
        SeriesEntry {
            label: label.to_string(),
            series_id: id.to_string(),
            role,
            description: String::new(),
        }
    }

    #[test]
    fn builtin_registry_is_valid() {
        let builtin = SeriesRegistry::builtin();
        let checked = SeriesRegistry::new(builtin.version(), builtin.entries().to_vec()).unwrap();
        assert_eq!(checked, builtin);
        assert_eq!(builtin.total().unwrap().series_id, "WALCL");
        for label in DEFAULT_SELECTION {
            assert!(builtin.by_label(label).is_some(), "missing default label {label}");
        }
    }

    #[test]
    fn id_collision_is_rejected() {
        // Two unrelated concepts wired to the same upstream id.
        let err = SeriesRegistry::new(
            1,
            vec![
                entry("Mortgage-Backed Securities", "SWPT", SeriesRole::Component),
                entry("Central Bank Liquidity Swaps", "SWPT", SeriesRole::Stress),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::IdCollision {
                series_id: "SWPT".into(),
                first: "Mortgage-Backed Securities".into(),
                second: "Central Bank Liquidity Swaps".into(),
            }
        );
    }

    #[test]
    fn duplicate_labels_blank_entries_and_two_totals_are_rejected() {
        assert!(matches!(
            SeriesRegistry::new(1, vec![entry("A", "X", SeriesRole::Component), entry("A", "Y", SeriesRole::Component)]),
            Err(RegistryError::DuplicateLabel { .. })
        ));
        assert!(matches!(
            SeriesRegistry::new(1, vec![entry("A", " ", SeriesRole::Component)]),
            Err(RegistryError::BlankEntry { index: 0 })
        ));
        assert!(matches!(
            SeriesRegistry::new(1, vec![entry("A", "X", SeriesRole::Total), entry("B", "Y", SeriesRole::Total)]),
            Err(RegistryError::MultipleTotals { .. })
        ));
        assert_eq!(SeriesRegistry::new(1, Vec::new()), Err(RegistryError::Empty));
    }

    #[test]
    fn registry_file_round_trips_through_validation() {
        let dir = std::env::temp_dir().join(format!("fedbs-registry-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("registry.json");
        std::fs::write(
            &path,
            r#"{"version": 7, "series": [
                {"label": "Total Assets", "series_id": "WALCL", "role": "total"},
                {"label": "Loans", "series_id": "WLCFLL", "role": "stress", "description": "loans"}
            ]}"#,
        )
        .unwrap();

        let registry = SeriesRegistry::from_json_file(&path).unwrap();
        assert_eq!(registry.version(), 7);
        assert_eq!(registry.labels(), vec!["Total Assets", "Loans"]);
        assert_eq!(registry.labels_with_role(SeriesRole::Stress), vec!["Loans"]);
        assert_eq!(registry.position("Loans"), Some(1));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
