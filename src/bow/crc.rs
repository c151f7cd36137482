/// Chained CRC-32 (IEEE polynomial, reflected) used to verify a replayed
/// bow log payload.
///
/// The checksum is computed over the payload one 4096-byte block at a time,
/// but the running state is *not* reset between blocks: folding block `k`
/// continues from the state left by block `k-1`, exactly as if the whole
/// payload had been hashed in one pass. `crc32fast::Hasher` is a rolling
/// CRC-32 accumulator, so this is just repeated `update()` calls.
pub struct ChainedCrc {
    hasher: crc32fast::Hasher,
}

impl ChainedCrc {
    /// Start a chain with the entry's required initial state (`source / 8`).
    pub fn new(initial: u32) -> Self {
        Self {
            hasher: crc32fast::Hasher::new_with_initial(initial),
        }
    }

    /// Fold one block (any length, but callers always pass 4096-byte blocks).
    pub fn fold_block(&mut self, block: &[u8]) {
        self.hasher.update(block);
    }

    /// Consume the chain and return the final CRC-32 value.
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

/// Convenience one-shot helper: fold `payload` in `block_size`-sized chunks
/// starting from `initial`, returning the final CRC.
pub fn chained_crc32(initial: u32, payload: &[u8], block_size: usize) -> u32 {
    let mut crc = ChainedCrc::new(initial);
    for block in payload.chunks(block_size) {
        crc.fold_block(block);
    }
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chaining_matches_one_shot_hashing() {
        let payload = vec![0x42u8; 4096 * 3];
        let chained = chained_crc32(7, &payload, 4096);

        let mut hasher = crc32fast::Hasher::new_with_initial(7);
        hasher.update(&payload);
        let one_shot = hasher.finalize();

        assert_eq!(chained, one_shot);
    }

    #[test]
    fn different_initial_values_diverge() {
        let payload = vec![0xAAu8; 4096];
        assert_ne!(chained_crc32(1, &payload, 4096), chained_crc32(2, &payload, 4096));
    }

    #[test]
    fn block_by_block_matches_whole_payload_fold() {
        let payload: Vec<u8> = (0..4096 * 2).map(|b| (b % 256) as u8).collect();

        let mut incremental = ChainedCrc::new(1);
        for block in payload.chunks(4096) {
            incremental.fold_block(block);
        }

        let mut whole = ChainedCrc::new(1);
        whole.fold_block(&payload);

        assert_eq!(incremental.finalize(), whole.finalize());
    }
}
