use crate::version::SchemaVersion;

/// A concrete variant type in a union's history.
///
/// Implemented by every struct that represents one version of a schema.
/// Typed converters read the version numbers from here, so an edge cannot
/// be registered between the wrong pair of types.
///
/// The `#[variant]` attribute macro generates this implementation.
pub trait Schema: Sized {
    /// Version this type represents.
    const VERSION: SchemaVersion;

    /// Name of the union this variant belongs to.
    const UNION: &'static str;
}
