//! Content-hash keying primitive shared by the cache and the planner.
//!
//! A tiny, dependency-light crate the rest of the workspace leans on for a
//! stable 32-byte digest, kept separate from the main crate so it can be
//! reused without pulling in the parser, the runner, or any of their
//! dependencies.

use sha2::{Digest, Sha256};

/// Width, in bytes, of a [`CacheKeyHasher`] digest.
pub const DIGEST_LEN: usize = 32;

/// Fixed-width content-hash digest.
pub type Digest32 = [u8; DIGEST_LEN];

/// Builds a [`Digest32`] by feeding it a sequence of byte strings in a fixed,
/// caller-chosen order.
///
/// Unlike [`std::hash::Hasher`], `CacheKeyHasher` never mixes in the
/// allocator's view of a type's layout: every byte that ends up in the digest
/// was written explicitly by the caller, which is what makes the resulting
/// key reproducible across processes, platforms and Rust versions — a
/// requirement for an on-disk cache key, but not for an in-memory `HashMap`.
#[derive(Debug, Default)]
pub struct CacheKeyHasher {
    hasher: Sha256,
}

impl CacheKeyHasher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    /// Feed raw bytes into the digest, followed by a NUL separator.
    ///
    /// The separator prevents `update(b"ab"); update(b"c")` from colliding
    /// with `update(b"a"); update(b"bc")`.
    pub fn update(&mut self, bytes: &[u8]) -> &mut Self {
        self.hasher.update(bytes);
        self.hasher.update([0u8]);
        self
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.update(s.as_bytes())
    }

    pub fn update_u64(&mut self, value: u64) -> &mut Self {
        self.update(&value.to_le_bytes())
    }

    #[must_use]
    pub fn finish(self) -> Digest32 {
        self.hasher.finalize().into()
    }
}

/// Lowercase hex encoding, as stored in `.woof-cache/<stem>/<cell-id>.json`.
#[must_use]
pub fn to_hex(digest: &Digest32) -> String {
    digest.iter().fold(String::with_capacity(64), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Parses a lowercase hex digest back into bytes. Returns `None` on malformed
/// input rather than panicking, since this is used to interpret files found
/// on disk.
#[must_use]
pub fn from_hex(s: &str) -> Option<Digest32> {
    if s.len() != DIGEST_LEN * 2 {
        return None;
    }
    let mut out = [0u8; DIGEST_LEN];
    for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
        let byte = std::str::from_utf8(chunk).ok()?;
        out[i] = u8::from_str_radix(byte, 16).ok()?;
    }
    Some(out)
}
