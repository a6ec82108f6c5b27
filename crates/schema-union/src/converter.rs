//! Adjacent-version converters.

use crate::error::ConversionError;

/// Transforms a value of one variant into the variant of the next version.
///
/// Converters only ever run between adjacent versions: vN→vN+1. Longer
/// conversions are built by the registry by chaining them.
///
/// Every converter must be **deterministic and pure**. Resolution may run on
/// a latency-sensitive read path and from many threads at once, so a
/// converter should not block or reach outside its input.
///
/// Closures of the shape `Fn(P) -> Result<P, ConversionError>` implement this
/// trait directly; wrap an infallible closure with [`pure`].
pub trait Converter<P>: Send + Sync {
    /// Convert `input` to the next version's shape.
    fn convert(&self, input: P) -> Result<P, ConversionError>;
}

impl<P, F> Converter<P> for F
where
    F: Fn(P) -> Result<P, ConversionError> + Send + Sync,
{
    fn convert(&self, input: P) -> Result<P, ConversionError> {
        self(input)
    }
}

/// A converter that cannot fail. Built by [`pure`].
#[derive(Debug, Clone, Copy)]
pub struct Pure<F>(F);

/// Wrap an infallible transform as a [`Converter`].
///
/// ```
/// use schema_union::{converter, Converter};
///
/// let double = converter::pure(|n: i64| n * 2);
/// assert_eq!(double.convert(21).unwrap(), 42);
/// ```
pub fn pure<P, F>(f: F) -> Pure<F>
where
    F: Fn(P) -> P + Send + Sync,
{
    Pure(f)
}

impl<P, F> Converter<P> for Pure<F>
where
    F: Fn(P) -> P + Send + Sync,
{
    fn convert(&self, input: P) -> Result<P, ConversionError> {
        Ok((self.0)(input))
    }
}
