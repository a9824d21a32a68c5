//! Identifier space: SHA-1 positions on a circle of size 2^160.

use std::fmt;

use num_bigint::BigUint;
use serde::{Serialize, Serializer};
use sha1::{Digest, Sha1};

/// Width of the identifier space in bits.
pub const ID_BITS: usize = 160;

/// Width of an encoded identifier in bytes.
pub const ID_BYTES: usize = ID_BITS / 8;

/// A point on the ring, always reduced modulo 2^160.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(BigUint);

fn modulus() -> BigUint {
    BigUint::from(1u8) << ID_BITS
}

impl Identifier {
    /// Builds an identifier from exactly [`ID_BYTES`] big-endian bytes, the
    /// wire encoding. Any other length gives `None`.
    pub fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != ID_BYTES {
            return None;
        }
        Some(Identifier(BigUint::from_bytes_be(bytes)))
    }

    /// Fixed-width big-endian encoding used on the wire.
    pub fn to_bytes_be(&self) -> [u8; ID_BYTES] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; ID_BYTES];
        out[ID_BYTES - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// `(self + 2^k) mod 2^160`, the start of finger `k + 1`.
    pub fn add_power_of_two(&self, k: usize) -> Self {
        Identifier((&self.0 + (BigUint::from(1u8) << k)) % modulus())
    }

    /// Clockwise distance from `self` to `other`.
    pub fn distance_to(&self, other: &Identifier) -> BigUint {
        let m = modulus();
        (&other.0 + &m - &self.0) % m
    }
}

impl From<u64> for Identifier {
    fn from(v: u64) -> Self {
        Identifier(BigUint::from(v))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes_be() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({self})")
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// SHA-1 of `s`, read as a big unsigned integer. Used for both node addresses
/// and keys.
pub fn hash(s: &str) -> Identifier {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    Identifier(BigUint::from_bytes_be(&digest))
}

/// Whether `x` lies in `(start, end)` walking clockwise, or `(start, end]` when
/// `inclusive` is set.
///
/// `start == end` denotes the full circle, so every `x != start` is inside and
/// `x == start` is inside only when `inclusive`.
pub fn between(start: &Identifier, x: &Identifier, end: &Identifier, inclusive: bool) -> bool {
    if inclusive && x == end {
        return true;
    }
    if end > start {
        start < x && x < end
    } else {
        start < x || x < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(v: u64) -> Identifier {
        Identifier::from(v)
    }

    fn max_id() -> Identifier {
        Identifier::from_bytes_be(&[0xff; ID_BYTES]).unwrap()
    }

    #[test]
    fn test_hash_matches_sha1() {
        assert_eq!(
            hash("abc").to_string(),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(hash("10.0.0.1:8000"), hash("10.0.0.1:8000"));
        assert_ne!(hash("10.0.0.1:8000"), hash("10.0.0.2:8001"));
    }

    #[test]
    fn test_bytes_are_fixed_width() {
        let small = id(1);
        let bytes = small.to_bytes_be();
        assert_eq!(bytes.len(), ID_BYTES);
        assert_eq!(bytes[ID_BYTES - 1], 1);
        assert_eq!(Identifier::from_bytes_be(&bytes), Some(small));
        assert_eq!(Identifier::from_bytes_be(&[0u8; ID_BYTES + 1]), None);
        assert_eq!(Identifier::from_bytes_be(&bytes[1..]), None);
        assert_eq!(Identifier::from_bytes_be(&[]), None);
    }

    #[test]
    fn test_add_power_of_two_wraps() {
        assert_eq!(id(5).add_power_of_two(0), id(6));
        assert_eq!(id(5).add_power_of_two(3), id(13));
        assert_eq!(max_id().add_power_of_two(0), id(0));
        assert_eq!(id(7).add_power_of_two(ID_BITS - 1).add_power_of_two(ID_BITS - 1), id(7));
    }

    #[test]
    fn test_between_plain_interval() {
        assert!(between(&id(10), &id(15), &id(20), false));
        assert!(!between(&id(10), &id(10), &id(20), false));
        assert!(!between(&id(10), &id(20), &id(20), false));
        assert!(between(&id(10), &id(20), &id(20), true));
        assert!(!between(&id(10), &id(25), &id(20), true));
        assert!(!between(&id(10), &id(5), &id(20), true));
    }

    #[test]
    fn test_between_wraparound() {
        let start = max_id();
        assert!(between(&start, &id(0), &id(20), false));
        assert!(between(&id(20), &id(3), &id(10), false));
        assert!(between(&id(20), &id(30), &id(10), false));
        assert!(!between(&id(20), &id(15), &id(10), false));
        assert!(between(&id(20), &id(10), &id(10), true));
        assert!(!between(&id(20), &id(20), &id(10), true));
    }

    #[test]
    fn test_between_full_circle() {
        assert!(between(&id(7), &id(8), &id(7), false));
        assert!(between(&id(7), &id(6), &id(7), false));
        assert!(!between(&id(7), &id(7), &id(7), false));
        assert!(between(&id(7), &id(7), &id(7), true));
    }

    fn reference_between(
        start: &Identifier,
        x: &Identifier,
        end: &Identifier,
        inclusive: bool,
    ) -> bool {
        let dx = start.distance_to(x);
        let mut dend = start.distance_to(end);
        if dend == BigUint::from(0u8) {
            dend = modulus();
        }
        let zero = BigUint::from(0u8);
        (dx > zero && dx < dend) || (inclusive && x == end)
    }

    fn any_id() -> impl Strategy<Value = Identifier> {
        prop::array::uniform20(any::<u8>()).prop_map(|b| Identifier::from_bytes_be(&b).unwrap())
    }

    // A handful of values so that start, x and end collide often.
    fn small_id() -> impl Strategy<Value = Identifier> {
        prop_oneof![
            (0u64..8).prop_map(Identifier::from),
            Just(max_id()),
        ]
    }

    proptest! {
        #[test]
        fn prop_between_matches_modular_reference(
            start in any_id(),
            x in any_id(),
            end in any_id(),
            inclusive in any::<bool>(),
        ) {
            prop_assert_eq!(
                between(&start, &x, &end, inclusive),
                reference_between(&start, &x, &end, inclusive)
            );
        }

        #[test]
        fn prop_between_boundaries(
            start in small_id(),
            x in small_id(),
            end in small_id(),
            inclusive in any::<bool>(),
        ) {
            prop_assert_eq!(
                between(&start, &x, &end, inclusive),
                reference_between(&start, &x, &end, inclusive)
            );
        }

        #[test]
        fn prop_start_is_never_inside_unless_it_is_the_end(
            start in any_id(),
            end in any_id(),
            inclusive in any::<bool>(),
        ) {
            let expected = inclusive && start == end;
            prop_assert_eq!(between(&start, &start, &end, inclusive), expected);
        }
    }
}
