use std::collections::BTreeMap;

use crate::structures::{Color, EditSet};

/// Splits an edit set into record-sized chunks. Keys are taken in ascending
/// canvas order, so the split only depends on the set's contents.
pub fn chunk(edits: &EditSet, capacity: usize) -> Vec<BTreeMap<u32, Color>> {
    if capacity == 0 {
        return Vec::new();
    }

    let sorted: BTreeMap<u32, Color> = edits.iter().map(|(k, v)| (*k, *v)).collect();
    let mut chunks = Vec::with_capacity(sorted.len().div_ceil(capacity));
    let mut current = BTreeMap::new();

    for (index, color) in sorted {
        current.insert(index, color);
        if current.len() == capacity {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::seq::SliceRandom;

    use super::*;

    fn edit_set(len: u32) -> EditSet {
        (0..len)
            .map(|i| (i * 7 % 10_000, Color::new(i as u8, 0, 0)))
            .collect()
    }

    #[test]
    fn test_chunk_sizes() {
        let cases: [(u32, Vec<usize>); 4] = [
            (0, vec![]),
            (1, vec![1]),
            (100, vec![100]),
            (250, vec![100, 100, 50]),
        ];
        for (len, expected) in cases {
            let chunks = chunk(&edit_set(len), 100);
            let sizes: Vec<usize> = chunks.iter().map(BTreeMap::len).collect();
            assert_eq!(sizes, expected);
        }
    }

    #[test]
    fn test_chunks_partition_in_ascending_order() {
        let edits = edit_set(345);
        let chunks = chunk(&edits, 100);

        let flattened: Vec<u32> = chunks.iter().flat_map(|c| c.keys().copied()).collect();
        assert!(flattened.windows(2).all(|w| w[0] < w[1]));

        let merged: EditSet = chunks.into_iter().flatten().collect();
        assert_eq!(merged, edits);
    }

    #[test]
    fn test_capacity_from_constants() {
        let config = crate::config::WallConfig::builtin().unwrap();
        assert_eq!(config.constants.capacity_pixels(), 100);
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut entries: Vec<(u32, Color)> = edit_set(230).into_iter().collect();
        let first: EditSet = entries.iter().copied().collect();

        entries.shuffle(&mut rand::thread_rng());
        let mut second = HashMap::with_capacity(1);
        second.extend(entries);

        assert_eq!(chunk(&first, 100), chunk(&second, 100));
    }
}
