//! Conflict vocabulary for factory registration.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::types::TypeKey;

/// What to do when a second factory claims an already bound key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
	/// Panic with both contenders named.
	Panic,
	/// Keep the first factory bound to a key.
	FirstWins,
	/// Rebind the key to the latest factory and log a warning.
	#[default]
	LastWins,
}

impl FromStr for DuplicatePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
			"panic" => Ok(Self::Panic),
			"first-wins" => Ok(Self::FirstWins),
			"last-wins" => Ok(Self::LastWins),
			other => Err(format!("unknown duplicate policy {other:?}")),
		}
	}
}

/// Which lookup key a binding was made under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
	/// Key derived from the concrete payload type.
	Concrete,
	/// Key derived from the transient interface a current version implements.
	Transient,
	/// Type name used by name lookups, shared by two distinct types.
	Name,
}

impl fmt::Display for KeyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Concrete => write!(f, "concrete"),
			Self::Transient => write!(f, "transient"),
			Self::Name => write!(f, "name"),
		}
	}
}

/// Outcome of binding one key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
	/// Key was new.
	InsertedNew,
	/// Key existed; the existing factory stayed bound.
	KeptExisting,
	/// Key existed; rebound to the incoming factory.
	ReplacedExisting,
}

/// Record of two factories claiming the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
	pub key: TypeKey,
	pub kind: KeyKind,
	/// Payload type of the factory bound before the conflict.
	pub existing: TypeKey,
	/// Payload type of the factory that triggered it.
	pub incoming: TypeKey,
	pub resolution: Resolution,
}

impl fmt::Display for Collision {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (winner, loser) = match self.resolution {
			Resolution::ReplacedExisting => (self.incoming, self.existing),
			_ => (self.existing, self.incoming),
		};
		write!(f, "{} key {}: {winner} wins over {loser}", self.kind, self.key)
	}
}
