// ============================================================
// Layer 4 — Epoch Shuffler
// ============================================================
// Produces the per-epoch sample order and cuts it into
// contiguous mini-batch slices.
//
// A fresh permutation is drawn at the start of every epoch from
// the run's seeded generator, so a run is reproducible end to
// end from its seed. The last batch is short when the sample
// count is not a multiple of the batch size.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{seq::SliceRandom, Rng};

/// A random permutation of `0..count`.
pub fn epoch_permutation<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..count).collect();
    order.shuffle(rng);
    order
}

/// Contiguous batch-sized slices of `order`.
pub fn batch_slices(order: &[usize], batch_size: usize) -> std::slice::Chunks<'_, usize> {
    order.chunks(batch_size.max(1))
}

/// Number of batches one epoch of `count` samples produces.
pub fn batches_per_epoch(count: usize, batch_size: usize) -> usize {
    let batch_size = batch_size.max(1);
    (count + batch_size - 1) / batch_size
}
