/// Implements the shared behaviour of the `Slot` and `Epoch` newtypes: plain
/// `u64` semantics for arithmetic and comparison, plus SSZ, tree hash and
/// serde support that delegate to the inner integer.
macro_rules! impl_common {
    ($type: ident) => {
        impl $type {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn max_value() -> Self {
                Self(u64::max_value())
            }

            pub fn saturating_add<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_add(other.into()))
            }

            pub fn saturating_sub<T: Into<u64>>(&self, other: T) -> Self {
                Self(self.0.saturating_sub(other.into()))
            }
        }

        impl From<u64> for $type {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$type> for u64 {
            fn from(value: $type) -> u64 {
                value.0
            }
        }

        impl std::ops::Add<u64> for $type {
            type Output = Self;

            fn add(self, other: u64) -> Self {
                Self(self.0 + other)
            }
        }

        impl std::ops::AddAssign<u64> for $type {
            fn add_assign(&mut self, other: u64) {
                self.0 += other;
            }
        }

        impl std::ops::Sub<u64> for $type {
            type Output = Self;

            fn sub(self, other: u64) -> Self {
                Self(self.0 - other)
            }
        }

        impl std::ops::Rem<u64> for $type {
            type Output = u64;

            fn rem(self, other: u64) -> u64 {
                self.0 % other
            }
        }

        impl PartialEq<u64> for $type {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl safe_arith::SafeArith for $type {
            const ZERO: Self = Self::new(0);
            const ONE: Self = Self::new(1);

            fn safe_add(&self, other: Self) -> safe_arith::Result<Self> {
                safe_arith::SafeArith::safe_add(&self.0, other.0).map(Self)
            }

            fn safe_sub(&self, other: Self) -> safe_arith::Result<Self> {
                safe_arith::SafeArith::safe_sub(&self.0, other.0).map(Self)
            }

            fn safe_mul(&self, other: Self) -> safe_arith::Result<Self> {
                safe_arith::SafeArith::safe_mul(&self.0, other.0).map(Self)
            }

            fn safe_div(&self, other: Self) -> safe_arith::Result<Self> {
                safe_arith::SafeArith::safe_div(&self.0, other.0).map(Self)
            }

            fn safe_rem(&self, other: Self) -> safe_arith::Result<Self> {
                safe_arith::SafeArith::safe_rem(&self.0, other.0).map(Self)
            }
        }

        impl ssz::Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ssz::Encode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ssz::Encode>::ssz_fixed_len()
            }

            fn ssz_bytes_len(&self) -> usize {
                ssz::Encode::ssz_bytes_len(&self.0)
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                ssz::Encode::ssz_append(&self.0, buf)
            }
        }

        impl ssz::Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                <u64 as ssz::Decode>::is_ssz_fixed_len()
            }

            fn ssz_fixed_len() -> usize {
                <u64 as ssz::Decode>::ssz_fixed_len()
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
                u64::from_ssz_bytes(bytes).map(Self)
            }
        }

        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                <u64 as tree_hash::TreeHash>::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                tree_hash::TreeHash::tree_hash_packed_encoding(&self.0)
            }

            fn tree_hash_packing_factor() -> usize {
                <u64 as tree_hash::TreeHash>::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> Vec<u8> {
                tree_hash::TreeHash::tree_hash_root(&self.0)
            }
        }

        impl serde::Serialize for $type {
            fn serialize<S: serde::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_u64(self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $type {
            fn deserialize<D: serde::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                u64::deserialize(deserializer).map(Self)
            }
        }
    };
}
