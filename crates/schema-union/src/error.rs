//! Error types.
//!
//! Errors split by when they happen. [`RegistryError`] is raised while the
//! version chain is being assembled and is meant to abort startup.
//! [`ResolveError`] is raised per message and goes back to the caller of
//! [`Resolver::resolve`](crate::Resolver::resolve).

use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::version::SchemaVersion;

/// Configuration-time error in the version registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A variant was registered out of sequence.
    #[error("version gap: expected {expected}, got {found}")]
    VersionGap {
        /// The only version that could have been registered next.
        expected: SchemaVersion,
        /// The version that was supplied.
        found: SchemaVersion,
    },
    /// The variant is already registered.
    #[error("{version} is already registered")]
    DuplicateVersion {
        /// The duplicate version.
        version: SchemaVersion,
    },
    /// A converter must go from a version to its direct successor.
    #[error("converter {from}→{to} is not between adjacent versions")]
    NonAdjacentConversion {
        /// Source version.
        from: SchemaVersion,
        /// Target version.
        to: SchemaVersion,
    },
    /// The edge already has a converter.
    #[error("converter {from}→{to} is already registered")]
    DuplicateConverter {
        /// Source version.
        from: SchemaVersion,
        /// Target version.
        to: SchemaVersion,
    },
    /// An edge below the latest version has no converter.
    #[error("missing converter {from}→{to}")]
    MissingConverter {
        /// Source version of the first missing edge.
        from: SchemaVersion,
        /// Target version of the first missing edge.
        to: SchemaVersion,
    },
    /// A converter targets a version that was never registered.
    #[error("converter {from}→{to} targets an unregistered version")]
    DanglingConverter {
        /// Source version.
        from: SchemaVersion,
        /// Target version.
        to: SchemaVersion,
    },
    /// A typed converter joins variants of two different unions.
    #[error("converter {from}→{to} joins union `{source_union}` to `{target_union}`")]
    UnionMismatch {
        /// Source version.
        from: SchemaVersion,
        /// Target version.
        to: SchemaVersion,
        /// Union of the source variant.
        source_union: &'static str,
        /// Union of the target variant.
        target_union: &'static str,
    },
    /// The version is not in the registry.
    #[error("unknown {version}")]
    UnknownVersion {
        /// The requested version.
        version: SchemaVersion,
        /// The registry's latest version, if any.
        latest: Option<SchemaVersion>,
    },
    /// No versions have been registered.
    #[error("registry has no versions")]
    Empty,
}

/// A single converter failed on its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ConversionError {
    reason: String,
}

impl ConversionError {
    /// Create a conversion error from any displayable reason.
    pub fn new(reason: impl core::fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }

    /// The failure reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<postcard::Error> for ConversionError {
    fn from(e: postcard::Error) -> Self {
        Self::new(e)
    }
}

/// Request-time error returned by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The message version is outside what this process can read: newer than
    /// the latest registered version, or older than the configured floor.
    #[error("cannot read {version}: supported range is {oldest}..={latest}")]
    UnknownVersion {
        /// Version carried by the message.
        version: SchemaVersion,
        /// Oldest version this resolver accepts.
        oldest: SchemaVersion,
        /// Latest registered version.
        latest: SchemaVersion,
    },
    /// A converter in the chain failed. The rest of the chain was skipped.
    #[error("conversion {from}→{to} failed: {source}")]
    ConversionFailed {
        /// Source version of the failing edge.
        from: SchemaVersion,
        /// Target version of the failing edge.
        to: SchemaVersion,
        /// What the converter reported.
        #[source]
        source: ConversionError,
    },
    /// The resolved payload could not be decoded as the requested type.
    #[error("decoding {version} payload failed: {source}")]
    Decode {
        /// Version of the resolved payload.
        version: SchemaVersion,
        /// What went wrong.
        #[source]
        source: ConversionError,
    },
    /// The registry could not compose a chain.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The wire envelope could not be parsed.
    #[error("envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
}

impl ResolveError {
    /// The failing edge, for a conversion failure.
    pub fn failed_edge(&self) -> Option<(SchemaVersion, SchemaVersion)> {
        match self {
            Self::ConversionFailed { from, to, .. } => Some((*from, *to)),
            _ => None,
        }
    }
}
