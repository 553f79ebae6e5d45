/// Number of shared memory banks.
pub const NUM_BANKS: usize = 32;
/// Width of a bank, in bytes.
pub const BANK_WIDTH: usize = 4;

/// Bank serving a byte address.
pub fn bank_of(address: usize) -> usize {
    (address / BANK_WIDTH) % NUM_BANKS
}

/// Serialization degree of one plane-wide shared memory access.
///
/// Every lane accesses one byte address. Lanes hitting the same word are served by a
/// broadcast, lanes hitting distinct words of the same bank are serialized. Returns the
/// number of passes the access needs: 1 when conflict free, 0 for an empty access.
pub fn bank_conflict_degree(addresses: &[usize]) -> usize {
    let mut words: Vec<usize> = addresses.iter().map(|address| address / BANK_WIDTH).collect();
    words.sort_unstable();
    words.dedup();

    let mut per_bank = [0usize; NUM_BANKS];
    for word in words {
        per_bank[word % NUM_BANKS] += 1;
    }
    per_bank.into_iter().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_words_are_conflict_free() {
        let addresses: Vec<usize> = (0..32).map(|lane| lane * 4).collect();
        assert_eq!(bank_conflict_degree(&addresses), 1);
    }

    #[test]
    fn same_word_is_a_broadcast() {
        assert_eq!(bank_conflict_degree(&[64; 32]), 1);
        assert_eq!(bank_conflict_degree(&[]), 0);
    }

    #[test]
    fn column_access_serializes() {
        // 32 lanes reading one column of a 32 wide f32 tile.
        let addresses: Vec<usize> = (0..32).map(|lane| lane * 32 * 4).collect();
        assert_eq!(bank_conflict_degree(&addresses), 32);
        assert_eq!(bank_of(32 * 4), 0);
    }
}
