/// Source of the random values a [`NamespaceIdGenerator`] is seeded with: the
/// starting counter, and the machine discriminator on hosts that expose no
/// stable identity.
///
/// Tests substitute a fixed source to make generated identifiers predictable.
///
/// # Example
/// ```
/// use nsid::{NamespaceIdGenerator, RandSource, WallClock};
///
/// struct Seed(u32);
/// impl RandSource<u32> for Seed {
///     fn rand(&self) -> u32 {
///         self.0
///     }
/// }
///
/// let generator = NamespaceIdGenerator::new(WallClock, &Seed(41));
/// assert_eq!(generator.next_id().counter(), 41);
/// ```
///
/// [`NamespaceIdGenerator`]: crate::NamespaceIdGenerator
pub trait RandSource<T> {
    fn rand(&self) -> T;
}
