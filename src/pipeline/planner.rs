//! The encoding planner: repeatedly measures every candidate order, scores
//! it, commits the best one, and stops when nothing clears the threshold.
//!
//! Each round transforms the partition into a candidate order, gathers its
//! statistics, and restores horizontal order; the winner is encoded and then
//! added to the ignore set, so the loop terminates even when scores tie.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::EncoderConfig;
use crate::encoding::{self, IterationOrder, PID_DELTA_BASE, PID_DELTA_MAX};
use crate::matrix::partition::SparsePartition;
use crate::pipeline::encoder;
use crate::pipeline::stats::{self, Stats};

pub struct Planner<'a, V> {
    spm: &'a mut SparsePartition<V>,
    config: &'a EncoderConfig,
    ignore: HashSet<IterationOrder>,
    stats: HashMap<IterationOrder, Stats>,
    deltas_to_encode: HashMap<IterationOrder, BTreeSet<u64>>,
}

impl<'a, V: Copy> Planner<'a, V> {
    pub fn new(spm: &'a mut SparsePartition<V>, config: &'a EncoderConfig) -> Self {
        let mut ignore: HashSet<IterationOrder> =
            encoding::ALWAYS_IGNORED.iter().copied().collect();
        ignore.extend(config.ignore.iter().copied());
        Self {
            spm,
            config,
            ignore,
            stats: HashMap::new(),
            deltas_to_encode: HashMap::new(),
        }
    }

    /// Excludes `order` from further planning rounds.
    pub fn add_ignore(&mut self, order: IterationOrder) {
        self.ignore.insert(order);
    }

    /// Excludes every candidate order.
    pub fn ignore_all(&mut self) {
        for order in encoding::candidates() {
            self.ignore.insert(order);
        }
    }

    /// Re-admits `order`, unless it is one of the always-ignored orders.
    pub fn remove_ignore(&mut self, order: IterationOrder) {
        if encoding::ALWAYS_IGNORED.contains(&order) {
            return;
        }
        match order {
            IterationOrder::BlockRow(k) | IterationOrder::BlockCol(k)
                if k == 0 || k > encoding::BLOCK_ALIGN_MAX =>
            {
                return;
            }
            _ => {}
        }
        self.ignore.remove(&order);
    }

    /// Re-admits every candidate order.
    pub fn remove_all(&mut self) {
        for order in encoding::candidates() {
            self.remove_ignore(order);
        }
    }

    /// Gathers and filters statistics for every non-ignored candidate.
    pub fn gen_all_stats(&mut self) {
        self.stats.clear();
        self.deltas_to_encode.clear();
        let total_nnz = self.spm.nr_nzeros();
        for order in encoding::candidates() {
            if self.ignore.contains(&order) {
                continue;
            }
            self.spm.transform(order);
            let mut st = stats::generate_stats(self.spm, self.config.min_limit);
            self.spm.transform(IterationOrder::Horizontal);

            let mut kept = stats::filter_stats(&mut st, total_nnz, self.config.min_perc);
            // Linear deltas must fit their pattern-id range: horizontal ids
            // are raw deltas and stay below the delta-list unit range, the
            // other linear orders below the id's delta width.
            let delta_ceiling = match order {
                IterationOrder::Horizontal => Some(PID_DELTA_BASE),
                IterationOrder::Vertical
                | IterationOrder::Diagonal
                | IterationOrder::AntiDiagonal => Some(PID_DELTA_MAX),
                _ => None,
            };
            if let Some(ceiling) = delta_ceiling {
                kept.retain(|&d| d < ceiling);
                st.retain(|&d, _| d < ceiling);
            }
            self.deltas_to_encode.insert(order, kept);
            self.stats.insert(order, st);
        }
    }

    /// Score of one candidate from the last statistics pass.
    pub fn type_score(&self, order: IterationOrder) -> u64 {
        self.stats.get(&order).map(stats::score).unwrap_or(0)
    }

    /// The candidate maximizing the score, if any scores above zero. Ties
    /// break toward the earlier candidate, keeping planning deterministic.
    pub fn choose_order(&self) -> Option<IterationOrder> {
        let mut best = None;
        let mut max_score = 0u64;
        for order in encoding::candidates() {
            let s = self.type_score(order);
            if s > max_score {
                max_score = s;
                best = Some(order);
            }
        }
        best
    }

    /// Encodes one order using the deltas that survived filtering, then
    /// ignores it for the rest of the run.
    pub fn encode(&mut self, order: IterationOrder) {
        let deltas = self
            .deltas_to_encode
            .get(&order)
            .cloned()
            .unwrap_or_default();
        encoder::encode(self.spm, order, &deltas, self.config);
        self.add_ignore(order);
    }

    /// Expands a previously committed order back into plain elements.
    pub fn decode(&mut self, order: IterationOrder) {
        encoder::decode(self.spm, order);
    }

    /// The full planning loop. Returns the committed `(order, score)`
    /// sequence in commit order.
    pub fn encode_all(&mut self) -> Vec<(IterationOrder, u64)> {
        let mut history = Vec::new();
        loop {
            if let Some(cap) = self.config.max_rounds {
                if history.len() >= cap {
                    break;
                }
            }
            self.gen_all_stats();
            self.log_stats();
            let Some(best) = self.choose_order() else {
                break;
            };
            let score = self.type_score(best);
            log::info!("encoding {:?} (score {})", best, score);
            self.encode(best);
            history.push((best, score));
        }
        history
    }

    fn log_stats(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        let total = self.spm.nr_nzeros() as f64;
        for order in encoding::candidates() {
            let Some(st) = self.stats.get(&order) else {
                continue;
            };
            for (delta, entry) in st {
                log::debug!(
                    "{:?}: {} -> np: {} nnz: {:.1}% ({})",
                    order,
                    delta,
                    entry.npatterns,
                    100.0 * entry.nnz as f64 / total,
                    entry.nnz,
                );
            }
        }
    }
}
