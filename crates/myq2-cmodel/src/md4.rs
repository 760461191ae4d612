// md4.rs — map checksum (Com_BlockChecksum) on top of the RustCrypto `md4` crate

use ::md4::{Digest, Md4};

/// XOR of the four little-endian MD4 digest words, as the server sends
/// to clients to verify they have the same map.
pub fn com_block_checksum(data: &[u8]) -> u32 {
    let digest = Md4::digest(data);
    digest
        .chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0, |acc, w| acc ^ w)
}
