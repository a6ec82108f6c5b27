//! Typed variants over postcard-encoded byte payloads.
//!
//! The engine itself only moves opaque payloads around. This module gives
//! the common case of "one struct per version, stored as bytes" a typed
//! face: converters are written as `fn(OldVariant) -> NewVariant` and the
//! encoding in between is handled here.

use std::fmt;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};

use crate::converter::Converter;
use crate::error::{ConversionError, RegistryError, ResolveError};
use crate::registry::VersionRegistry;
use crate::resolver::{Resolver, TaggedMessage};
use crate::schema::Schema;

/// Encode a variant with postcard.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ConversionError> {
    Ok(postcard::to_allocvec(value)?)
}

/// Decode a postcard-encoded variant.
///
/// The whole buffer must be consumed. Leftover bytes usually mean the
/// payload was written by a different (larger) variant.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConversionError> {
    let (value, rest) = postcard::take_from_bytes(bytes)?;
    if !rest.is_empty() {
        return Err(ConversionError::new(format!(
            "{} trailing bytes after {}",
            rest.len(),
            std::any::type_name::<T>()
        )));
    }
    Ok(value)
}

/// Encode `value` and tag it with its schema version.
pub fn tag<T: Schema + Serialize>(value: &T) -> Result<TaggedMessage<Vec<u8>>, ConversionError> {
    Ok(TaggedMessage::new(T::VERSION, encode(value)?))
}

/// Check that `A` and `B` are variants of the same union.
pub fn same_union<A: Schema, B: Schema>() -> Result<(), RegistryError> {
    if A::UNION == B::UNION {
        return Ok(());
    }
    Err(RegistryError::UnionMismatch {
        from: A::VERSION,
        to: B::VERSION,
        source_union: A::UNION,
        target_union: B::UNION,
    })
}

/// A byte-level converter built from a typed `Fn(A) -> B`.
pub struct TypedConverter<A, B, F> {
    f: F,
    _marker: PhantomData<fn(A) -> B>,
}

impl<A, B, F> TypedConverter<A, B, F>
where
    F: Fn(A) -> B,
{
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<A, B, F> fmt::Debug for TypedConverter<A, B, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedConverter")
            .field("from", &std::any::type_name::<A>())
            .field("to", &std::any::type_name::<B>())
            .finish()
    }
}

impl<A, B, F> Converter<Vec<u8>> for TypedConverter<A, B, F>
where
    A: DeserializeOwned,
    B: Serialize,
    F: Fn(A) -> B + Send + Sync,
{
    fn convert(&self, input: Vec<u8>) -> Result<Vec<u8>, ConversionError> {
        let old: A = decode(&input)?;
        encode(&(self.f)(old))
    }
}

impl VersionRegistry<Vec<u8>> {
    /// Register a typed converter on the edge `A::VERSION → B::VERSION`.
    ///
    /// Fails with [`RegistryError::UnionMismatch`] if `A` and `B` belong to
    /// different unions.
    ///
    /// ```
    /// use schema_union::{typed, Resolver, Schema, SchemaVersion, VersionRegistry};
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize, Deserialize)]
    /// struct SensorV1 { temperature: f32 }
    ///
    /// #[derive(Debug, PartialEq, Serialize, Deserialize)]
    /// struct SensorV2 { temperature: f32, humidity: Option<f32> }
    ///
    /// impl Schema for SensorV1 {
    ///     const VERSION: SchemaVersion = SchemaVersion::FIRST;
    ///     const UNION: &'static str = "sensor";
    /// }
    ///
    /// impl Schema for SensorV2 {
    ///     const VERSION: SchemaVersion = match SchemaVersion::new(2) {
    ///         Some(v) => v,
    ///         None => unreachable!(),
    ///     };
    ///     const UNION: &'static str = "sensor";
    /// }
    ///
    /// let mut registry = VersionRegistry::with_versions(2);
    /// registry
    ///     .register_typed(|old: SensorV1| SensorV2 { temperature: old.temperature, humidity: None })
    ///     .unwrap();
    /// let resolver = Resolver::new(registry).unwrap();
    ///
    /// let message = typed::tag(&SensorV1 { temperature: 22.5 }).unwrap();
    /// let latest: SensorV2 = resolver.resolve_as(message).unwrap();
    /// assert_eq!(latest, SensorV2 { temperature: 22.5, humidity: None });
    /// ```
    pub fn register_typed<A, B, F>(&mut self, f: F) -> Result<(), RegistryError>
    where
        A: Schema + DeserializeOwned + 'static,
        B: Schema + Serialize + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        same_union::<A, B>()?;
        self.register_converter(A::VERSION, B::VERSION, TypedConverter::new(f))
    }
}

impl Resolver<Vec<u8>> {
    /// Resolve `message` and decode the result as the latest variant `T`.
    ///
    /// Fails with [`ResolveError::Decode`] if `T` is not the latest version's
    /// type or its bytes do not decode.
    pub fn resolve_as<T>(&self, message: TaggedMessage<Vec<u8>>) -> Result<T, ResolveError>
    where
        T: Schema + DeserializeOwned,
    {
        let resolved = self.resolve(message)?;
        if T::VERSION != resolved.version {
            return Err(ResolveError::Decode {
                version: resolved.version,
                source: ConversionError::new(format!(
                    "{} is {}, not {}",
                    std::any::type_name::<T>(),
                    T::VERSION,
                    resolved.version
                )),
            });
        }
        decode(&resolved.payload).map_err(|source| ResolveError::Decode {
            version: resolved.version,
            source,
        })
    }
}
