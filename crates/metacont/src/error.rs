use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use crate::source::SourceId;
use crate::types::TypeKey;

/// Payload handed to the type-erased insert path.
pub type ErasedPayload = Box<dyn Any + Send + Sync>;

/// A typed insert hit a source that already holds a payload.
///
/// The rejected payload is returned to the caller untouched.
#[derive(thiserror::Error)]
#[error("source {sid} already holds a payload")]
pub struct Duplicate<T> {
	pub sid: SourceId,
	pub payload: T,
}

impl<T> Duplicate<T> {
	/// Returns the rejected payload.
	pub fn into_payload(self) -> T {
		self.payload
	}
}

impl<T> fmt::Debug for Duplicate<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Duplicate")
			.field("sid", &self.sid)
			.finish_non_exhaustive()
	}
}

/// Failure of a type-erased insert. Ownership of the payload never moves.
#[derive(thiserror::Error)]
pub enum InsertError {
	#[error("source {sid} already holds a payload")]
	Duplicate { sid: SourceId, payload: ErasedPayload },

	#[error("payload for source {sid} is not a {expected}")]
	TypeMismatch {
		sid: SourceId,
		expected: TypeKey,
		payload: ErasedPayload,
	},
}

impl InsertError {
	/// Returns the rejected payload.
	pub fn into_payload(self) -> ErasedPayload {
		match self {
			Self::Duplicate { payload, .. } | Self::TypeMismatch { payload, .. } => payload,
		}
	}

	pub fn is_duplicate(&self) -> bool {
		matches!(self, Self::Duplicate { .. })
	}

	pub fn is_type_mismatch(&self) -> bool {
		matches!(self, Self::TypeMismatch { .. })
	}
}

impl fmt::Debug for InsertError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Duplicate { sid, .. } => f
				.debug_struct("Duplicate")
				.field("sid", sid)
				.finish_non_exhaustive(),
			Self::TypeMismatch { sid, expected, .. } => f
				.debug_struct("TypeMismatch")
				.field("sid", sid)
				.field("expected", expected)
				.finish_non_exhaustive(),
		}
	}
}

/// Errors from [`crate::store::MetaStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
	#[error("no container factory registered for {0}")]
	UnknownType(TypeKey),

	#[error("container {label:?} holds {existing}, not {requested}")]
	WrongType {
		label: String,
		existing: TypeKey,
		requested: TypeKey,
	},
}

/// Errors from loading [`crate::config::Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid config: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("invalid value {value:?} for {var}")]
	InvalidEnv { var: &'static str, value: String },
}
