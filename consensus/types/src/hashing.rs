//! Helpers for the hand-written `TreeHash` impls on list-bearing containers.
//!
//! The derive macro covers fixed-field containers. Containers holding `Vec`
//! fields hash the concatenation of their field roots, with list lengths
//! mixed in so lists with identical elements but different lengths never
//! collide. The scheme only needs to be internally consistent: block and
//! state identity is "the hash this node computes", not a wire format.

use eth2_hashing::hash;
use tree_hash::TreeHash;

/// Root of a homogeneous list: hash of the concatenated element roots with
/// the length mixed in.
pub fn list_tree_hash_root<T: TreeHash>(items: &[T]) -> Vec<u8> {
    let mut leaves = Vec::with_capacity(items.len() * 32);
    for item in items {
        leaves.append(&mut item.tree_hash_root());
    }
    mix_in_length(&hash(&leaves), items.len())
}

/// Root of a container: hash of the concatenated field roots.
pub fn container_tree_hash_root(field_roots: &[&[u8]]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(field_roots.len() * 32);
    for root in field_roots {
        preimage.extend_from_slice(root);
    }
    hash(&preimage)
}

fn mix_in_length(root: &[u8], length: usize) -> Vec<u8> {
    let mut preimage = root.to_vec();
    preimage.extend_from_slice(&(length as u64).to_le_bytes());
    preimage.extend_from_slice(&[0u8; 24]);
    hash(&preimage)
}

/// Implements `TreeHash` for a container type whose root is produced by a
/// `tree_hash_root` inherent-style expression over `self`.
macro_rules! impl_container_tree_hash {
    ($type: ty, $self_: ident, $body: expr) => {
        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                tree_hash::TreeHashType::Container
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                unreachable!("Container should never be packed.")
            }

            fn tree_hash_packing_factor() -> usize {
                unreachable!("Container should never be packed.")
            }

            fn tree_hash_root(&$self_) -> Vec<u8> {
                $body
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_roots_depend_on_length() {
        let a: Vec<u64> = vec![];
        let b: Vec<u64> = vec![0];
        assert_ne!(list_tree_hash_root(&a), list_tree_hash_root(&b));
    }

    #[test]
    fn list_roots_depend_on_contents() {
        assert_ne!(
            list_tree_hash_root(&[1u64, 2]),
            list_tree_hash_root(&[2u64, 1])
        );
    }

    #[test]
    fn roots_are_32_bytes() {
        assert_eq!(list_tree_hash_root(&[1u64]).len(), 32);
        let a = [0u8; 32];
        assert_eq!(container_tree_hash_root(&[&a, &a]).len(), 32);
    }
}
