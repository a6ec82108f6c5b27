//! # schema-union
//!
//! Schema evolution with the union pattern.
//!
//! Every historical shape of a schema stays readable forever. Messages carry
//! the version they were written with, and readers resolve them to the one
//! shape they understand (the latest) by running small converters between
//! adjacent versions.
//!
//! ## How It Works
//!
//! 1. At startup, every known version is registered in a [`VersionRegistry`]
//!    together with one [`Converter`] per adjacent pair (v1→v2, v2→v3, ...).
//! 2. The registry is validated once: no gaps, no missing converters.
//! 3. A [`Resolver`] takes any [`TaggedMessage`] and runs the chain from its
//!    version up to the latest. Messages newer than the latest are rejected,
//!    never guessed at.
//!
//! ## Key Concepts
//!
//! - **Linear chain**: conversions always run vN→vN+1→...→latest, never
//!   skipping steps.
//! - **Deterministic**: converters are pure; resolving the same message twice
//!   gives the same result.
//! - **All or nothing**: if one converter fails, no partial result escapes.
//! - **Opaque payloads**: the engine never looks inside a variant. Use
//!   [`typed`] for postcard-encoded structs, or any payload type you like.
//!
//! ## Quick Start
//!
//! ```
//! use schema_union::{converter, Resolver, SchemaVersion, TaggedMessage, VersionRegistry};
//! use serde_json::{json, Value};
//!
//! let v = |n| SchemaVersion::new(n).unwrap();
//!
//! let mut registry = VersionRegistry::with_versions(2);
//! registry
//!     .register_converter(
//!         v(1),
//!         v(2),
//!         converter::pure(|mut sensor: Value| {
//!             sensor["humidity"] = Value::Null;
//!             sensor
//!         }),
//!     )
//!     .unwrap();
//!
//! let resolver = Resolver::new(registry).unwrap();
//! let latest = resolver
//!     .resolve(TaggedMessage::new(v(1), json!({ "temperature": 22.5 })))
//!     .unwrap();
//!
//! assert_eq!(latest.version, v(2));
//! assert_eq!(latest.payload, json!({ "temperature": 22.5, "humidity": null }));
//! ```

#![warn(missing_docs)]

extern crate self as schema_union;

mod config;
pub mod converter;
mod envelope;
mod error;
mod registry;
mod resolver;
mod schema;
pub mod typed;
mod version;

pub use config::ResolverConfig;
pub use converter::Converter;
pub use envelope::{Envelope, EnvelopeError, ENVELOPE_HEADER_SIZE, MAGIC_BYTE};
pub use error::{ConversionError, RegistryError, ResolveError};
pub use registry::{ComposedChain, VersionEntry, VersionRegistry};
pub use resolver::{Resolver, TaggedMessage};
pub use schema::Schema;
pub use version::{SchemaVersion, ZeroVersion};

// Re-export proc macros when the `macros` feature is enabled.
#[cfg(feature = "macros")]
pub use schema_union_macros::{convert, variant};

/// Mistakes the attribute macros turn into compile errors.
///
/// A correct pair of variants and their converter:
///
/// ```
/// use schema_union::{convert, variant};
/// use serde::{Deserialize, Serialize};
///
/// #[variant(version = 1, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV1 { temperature: f32 }
///
/// #[variant(version = 2, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV2 { temperature: f32, humidity: Option<f32> }
///
/// #[convert(from = 1, to = 2)]
/// fn add_humidity(old: SensorV1) -> SensorV2 {
///     SensorV2 { temperature: old.temperature, humidity: None }
/// }
/// ```
///
/// Versions start at 1:
///
/// ```compile_fail
/// use schema_union::variant;
///
/// #[variant(version = 0, union = "sensor")]
/// struct SensorV0 { temperature: f32 }
/// ```
///
/// Converters only join adjacent versions:
///
/// ```compile_fail
/// use schema_union::{convert, variant};
/// use serde::{Deserialize, Serialize};
///
/// #[variant(version = 1, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV1 { temperature: f32 }
///
/// #[variant(version = 3, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV3 { temperature: f32, location: Option<String> }
///
/// #[convert(from = 1, to = 3)]
/// fn skip_ahead(old: SensorV1) -> SensorV3 {
///     SensorV3 { temperature: old.temperature, location: None }
/// }
/// ```
///
/// The declared edge must match the variants' own versions:
///
/// ```compile_fail
/// use schema_union::{convert, variant};
/// use serde::{Deserialize, Serialize};
///
/// #[variant(version = 2, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV2 { temperature: f32 }
///
/// #[variant(version = 3, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV3 { temperature: f32, location: Option<String> }
///
/// #[convert(from = 1, to = 2)]
/// fn wrong_edge(old: SensorV2) -> SensorV3 {
///     SensorV3 { temperature: old.temperature, location: None }
/// }
/// ```
///
/// A converter takes exactly one variant:
///
/// ```compile_fail
/// use schema_union::{convert, variant};
/// use serde::{Deserialize, Serialize};
///
/// #[variant(version = 1, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV1 { temperature: f32 }
///
/// #[variant(version = 2, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV2 { temperature: f32, humidity: Option<f32> }
///
/// #[convert(from = 1, to = 2)]
/// fn merge(a: SensorV1, b: SensorV1) -> SensorV2 {
///     SensorV2 { temperature: a.temperature + b.temperature, humidity: None }
/// }
/// ```
///
/// and returns one:
///
/// ```compile_fail
/// use schema_union::{convert, variant};
/// use serde::{Deserialize, Serialize};
///
/// #[variant(version = 1, union = "sensor")]
/// #[derive(Serialize, Deserialize)]
/// struct SensorV1 { temperature: f32 }
///
/// #[convert(from = 1, to = 2)]
/// fn discard(old: SensorV1) {
///     let _ = old;
/// }
/// ```
#[cfg(all(doctest, feature = "macros"))]
pub struct MacroRejections;
