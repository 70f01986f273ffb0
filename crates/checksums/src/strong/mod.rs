//! Strong checksum implementation backing the dirstate ignore-pattern hash.
//!
//! The dirstate docket reserves exactly one algorithm slot (20 bytes) rather
//! than negotiating among several, so this module exposes a single streaming
//! wrapper rather than a family of interchangeable digests.

mod sha1;

pub use sha1::Sha1;

/// Trait implemented by strong checksum algorithms used by this crate.
///
/// Implementors provide a streaming interface: callers feed data
/// incrementally via [`Self::update`] and then obtain the final digest
/// through [`Self::finalize`]. The associated [`DIGEST_LEN`](Self::DIGEST_LEN)
/// constant exposes the byte width of the resulting hash so higher layers can
/// size buffers without hard-coding algorithm-specific knowledge.
///
/// # Examples
///
/// ```
/// use checksums::strong::{Sha1, StrongDigest};
///
/// let mut hasher = Sha1::new();
/// hasher.update(b"example");
/// let digest = hasher.finalize();
/// assert_eq!(digest.as_ref().len(), Sha1::DIGEST_LEN);
/// ```
pub trait StrongDigest: Sized {
    /// Type used to parameterise a new digest instance.
    type Seed: Default;

    /// Type returned when finalising the digest.
    type Digest: AsRef<[u8]> + Copy;

    /// Length of the final digest in bytes.
    const DIGEST_LEN: usize;

    /// Creates a new hasher with an empty state.
    fn new() -> Self {
        Self::with_seed(Default::default())
    }

    /// Creates a new hasher using the provided seed value.
    fn with_seed(seed: Self::Seed) -> Self;

    /// Feeds additional bytes into the digest state.
    fn update(&mut self, data: &[u8]);

    /// Finalises the digest and returns the resulting hash.
    fn finalize(self) -> Self::Digest;

    /// Convenience helper that hashes `data` in a single call.
    fn digest(data: &[u8]) -> Self::Digest {
        Self::digest_with_seed(Default::default(), data)
    }

    /// Convenience helper that hashes `data` using an explicit seed value.
    fn digest_with_seed(seed: Self::Seed, data: &[u8]) -> Self::Digest {
        let mut hasher = Self::with_seed(seed);
        hasher.update(data);
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::Sha1;

    #[test]
    fn sha1_trait_matches_inherent_api() {
        let input = b"sha1-check";

        let mut via_trait = Sha1::new();
        via_trait.update(input);
        let trait_digest = via_trait.finalize();

        assert_eq!(trait_digest.as_ref(), Sha1::digest(input).as_ref());
    }
}
