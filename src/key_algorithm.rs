//! The [`KeyAlgorithm`] capability: a pure seed-to-key function, family
//! specific and out of scope for this crate. See spec [1], [6].

/// Derives a 16-bit unlock key from a 16-bit seed, for a given vehicle
/// family (`algorithm_id`). Implementations are pure and infallible from
/// this crate's point of view; a family the implementation doesn't
/// recognize is its own concern, not this trait's.
pub trait KeyAlgorithm {
    fn derive(&self, algorithm_id: u16, seed: u16) -> u16;
}
