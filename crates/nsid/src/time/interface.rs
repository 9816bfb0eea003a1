/// Wall-clock time for a [`NamespaceIdGenerator`], in milliseconds since the
/// Unix epoch.
///
/// Identifiers keep only whole seconds; the millisecond unit matches the
/// system clock so a mock can be dropped in without conversion.
///
/// # Example
///
/// ```
/// use nsid::{NamespaceIdGenerator, TimeSource};
///
/// struct Frozen;
/// impl TimeSource<u64> for Frozen {
///     fn current_millis(&self) -> u64 {
///         1_700_000_000_999
///     }
/// }
///
/// let generator = NamespaceIdGenerator::from_components(1, 2, 3, Frozen);
/// assert_eq!(generator.next_id().timestamp(), 1_700_000_000);
/// ```
///
/// [`NamespaceIdGenerator`]: crate::NamespaceIdGenerator
pub trait TimeSource<T> {
    fn current_millis(&self) -> T;
}
