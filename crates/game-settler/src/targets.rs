//! Static mapping from a winning team to the on-chain settlement target.
//!
//! The table is loaded from a TOML file once at startup and never changes
//! afterwards. All entries identify their token the same way (by name or by
//! address), which also decides which `forwardFeesToBC` overload the
//! settlement contract is called with.

use {
    alloy::primitives::Address,
    anyhow::{Context, Result},
    serde::Deserialize,
    std::{
        collections::{BTreeMap, HashMap, HashSet},
        fmt::{self, Display, Formatter},
        path::Path,
    },
    thiserror::Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentifierKind {
    Name,
    Address,
}

/// How the settlement contract identifies the token of the winning team.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetId {
    Name(String),
    Address(Address),
}

impl TargetId {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Self::Name(_) => IdentifierKind::Name,
            Self::Address(_) => IdentifierKind::Address,
        }
    }
}

impl Display for TargetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Address(address) => write!(f, "{address}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementTarget {
    pub identifier: TargetId,
    /// Token contract exposing `buybackAndBurn()`. No secondary action is
    /// attempted without it.
    pub secondary_contract: Option<Address>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no settlement targets configured")]
    Empty,
    #[error("winner name must not be empty")]
    EmptyWinner,
    #[error("target of {winner:?} has an empty identifier")]
    EmptyIdentifier { winner: String },
    #[error("target of {winner:?} is a {found:?} identifier but the table expects {expected:?}")]
    MixedIdentifierKinds {
        winner: String,
        expected: IdentifierKind,
        found: IdentifierKind,
    },
    #[error("target of {winner:?} has invalid address {value:?}")]
    InvalidAddress { winner: String, value: String },
    #[error("identifier {identifier} is used by more than one winner")]
    DuplicateIdentifier { identifier: String },
}

#[derive(Debug, Clone)]
pub struct SettlementTargets {
    kind: IdentifierKind,
    targets: HashMap<String, SettlementTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct File {
    identifier_kind: IdentifierKind,
    targets: BTreeMap<String, FileTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct FileTarget {
    identifier: String,
    secondary_contract: Option<String>,
}

impl SettlementTargets {
    /// Builds the table and checks that it is usable: not empty, every entry
    /// of the declared kind and no identifier shared by two winners.
    pub fn new(
        kind: IdentifierKind,
        targets: HashMap<String, SettlementTarget>,
    ) -> Result<Self, ConfigError> {
        if targets.is_empty() {
            return Err(ConfigError::Empty);
        }
        let mut seen = HashSet::new();
        for (winner, target) in &targets {
            if winner.trim().is_empty() {
                return Err(ConfigError::EmptyWinner);
            }
            if target.identifier.kind() != kind {
                return Err(ConfigError::MixedIdentifierKinds {
                    winner: winner.clone(),
                    expected: kind,
                    found: target.identifier.kind(),
                });
            }
            if matches!(&target.identifier, TargetId::Name(name) if name.trim().is_empty()) {
                return Err(ConfigError::EmptyIdentifier {
                    winner: winner.clone(),
                });
            }
            if !seen.insert(&target.identifier) {
                return Err(ConfigError::DuplicateIdentifier {
                    identifier: target.identifier.to_string(),
                });
            }
        }
        Ok(Self { kind, targets })
    }

    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("invalid settlement targets in {}", path.as_ref().display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: File = toml::from_str(content).context("failed to parse settlement targets")?;
        let targets = file
            .targets
            .into_iter()
            .map(|(winner, target)| -> Result<_, ConfigError> {
                let identifier = parse_identifier(file.identifier_kind, &winner, target.identifier)?;
                let secondary_contract = target
                    .secondary_contract
                    .map(|value| parse_address(&winner, value))
                    .transpose()?;
                Ok((
                    winner,
                    SettlementTarget {
                        identifier,
                        secondary_contract,
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(Self::new(file.identifier_kind, targets)?)
    }

    /// Exact, case-sensitive lookup of the winner's display name.
    pub fn target(&self, winner: &str) -> Option<&SettlementTarget> {
        self.targets.get(winner)
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn parse_identifier(
    kind: IdentifierKind,
    winner: &str,
    value: String,
) -> Result<TargetId, ConfigError> {
    match kind {
        IdentifierKind::Name => Ok(TargetId::Name(value)),
        IdentifierKind::Address => parse_address(winner, value).map(TargetId::Address),
    }
}

fn parse_address(winner: &str, value: String) -> Result<Address, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidAddress {
            winner: winner.to_string(),
            value,
        })
}
