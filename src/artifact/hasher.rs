//! Asset hash computation for build contexts using BLAKE3

use crate::types::Hash;
use blake3::Hasher;
use rs_merkle::MerkleTree;

/// BLAKE3 as the Merkle tree node hash
#[derive(Clone)]
pub struct Blake3Algorithm;

impl rs_merkle::Hasher for Blake3Algorithm {
    type Hash = Hash;

    fn hash(data: &[u8]) -> Hash {
        *blake3::hash(data).as_bytes()
    }
}

/// Compute content hash for file bytes
pub fn compute_content_hash(content: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

/// Compute the leaf hash of one file in the build context
///
/// Leaf = hash("file" || path_len || relative_path || content_hash)
///
/// Moving a file changes its leaf even when the content is identical.
pub fn compute_file_leaf(relative_path: &str, content_hash: &Hash) -> Hash {
    let path_bytes = relative_path.as_bytes();
    let mut hasher = Hasher::new();

    hasher.update(b"file");
    // 8 bytes, big-endian for determinism
    hasher.update(&(path_bytes.len() as u64).to_be_bytes());
    hasher.update(path_bytes);
    hasher.update(content_hash);

    *hasher.finalize().as_bytes()
}

/// Merkle root over file leaves, which must already be in path order
pub fn compute_context_root(leaves: &[Hash]) -> Hash {
    MerkleTree::<Blake3Algorithm>::from_leaves(leaves)
        .root()
        .unwrap_or_else(|| compute_content_hash(b"empty-context"))
}

/// Compute the asset hash as 64 lowercase hex characters
///
/// AssetHash = hash(root || platform || build_file || extra)
///
/// Each string is length-prefixed so adjacent fields cannot run together.
pub fn compute_asset_hash(
    root: &Hash,
    platform: &str,
    build_file: &str,
    extra: Option<&str>,
) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"asset");
    hasher.update(root);
    for field in [platform, build_file, extra.unwrap_or("")] {
        hasher.update(&(field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}
