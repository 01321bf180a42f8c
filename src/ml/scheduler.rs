// ============================================================
// Layer 5 — Cosine Learning-Rate Schedule with Warm Restarts
// ============================================================
// SGDR-style schedule, advanced once per batch:
//
//   t      = epochs since last restart + fraction of epoch done
//   η(t)   = 0.5 + 0.5 · cos(π · t / period)
//   lr     = min_lr + (base_lr − min_lr) · η(t)
//   wd     = base_wd · η(t) · √(batch / (epoch_size · period))
//
// When the epoch counter passes the current period the schedule
// restarts at full lr and the period grows by `t_mult`.
//
// Reference: Loshchilov & Hutter (2017) SGDR
//            Loshchilov & Hutter (2019) Decoupled Weight Decay

use anyhow::{bail, Result};
use std::f64::consts::PI;

/// Learning rate floor reached at the end of each cycle.
pub const MIN_LR: f64 = 1e-7;

/// Values for the next optimizer step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LrStep {
    pub lr:           f64,
    pub weight_decay: f64,
}

#[derive(Debug, Clone)]
pub struct CyclicLrWithRestarts {
    base_lr:        f64,
    base_wd:        f64,
    batch_size:     usize,
    epoch_size:     usize,
    restart_period: f64,
    t_mult:         f64,
    /// Epochs since the last restart, -1 before the first `step`
    t_epoch:        i64,
    /// Fractional epoch progress, one entry per batch
    increments:     Vec<f64>,
    cursor:         usize,
    restarts:       usize,
}

impl CyclicLrWithRestarts {
    pub fn new(
        base_lr:        f64,
        base_wd:        f64,
        batch_size:     usize,
        epoch_size:     usize,
        restart_period: usize,
        t_mult:         f64,
    ) -> Result<Self> {
        if batch_size == 0 || epoch_size == 0 {
            bail!("batch size and epoch size must be positive (got {batch_size} and {epoch_size})");
        }
        if restart_period == 0 {
            bail!("restart period must be at least one epoch");
        }
        if t_mult < 1.0 {
            bail!("restart multiplier must be >= 1 (got {t_mult})");
        }

        Ok(Self {
            base_lr,
            base_wd,
            batch_size,
            epoch_size,
            restart_period: restart_period as f64,
            t_mult,
            t_epoch:        -1,
            increments:     Self::epoch_increments(epoch_size, batch_size),
            cursor:         0,
            restarts:       0,
        })
    }

    /// Evenly spaced points on [0, 1], one more than the number of batches.
    fn epoch_increments(epoch_size: usize, batch_size: usize) -> Vec<f64> {
        let full = epoch_size / batch_size;
        let k = if epoch_size % batch_size > 0 { full + 2 } else { full + 1 };
        if k == 1 {
            return vec![0.0];
        }
        (0..k).map(|i| i as f64 / (k - 1) as f64).collect()
    }

    /// Start a new epoch and return the values for its first batch.
    pub fn step(&mut self) -> Result<LrStep> {
        self.t_epoch += 1;
        self.cursor = 0;
        self.batch_step()
    }

    /// Advance one batch within the current epoch.
    pub fn batch_step(&mut self) -> Result<LrStep> {
        let Some(&inc) = self.increments.get(self.cursor) else {
            bail!(
                "epoch_size ({}) and batch_size ({}) allow only {} batch steps per epoch",
                self.epoch_size,
                self.batch_size,
                self.increments.len()
            );
        };
        self.cursor += 1;

        let t_cur = self.t_epoch as f64 + inc;
        let eta   = 0.5 + 0.5 * (PI * t_cur / self.restart_period).cos();
        let lr    = MIN_LR + (self.base_lr - MIN_LR) * eta;
        let wd    = self.base_wd
            * eta
            * (self.batch_size as f64 / (self.epoch_size as f64 * self.restart_period)).sqrt();

        if self.t_epoch as f64 >= self.restart_period {
            self.restart_period = (self.restart_period * self.t_mult).ceil();
            self.t_epoch = 0;
            self.restarts += 1;
            tracing::info!("Warm restart {}, next period {} epochs", self.restarts, self.restart_period);
        }

        Ok(LrStep { lr, weight_decay: wd })
    }

    pub fn restart_period(&self) -> usize {
        self.restart_period as usize
    }

    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Batch steps available per epoch, including the one `step` takes.
    pub fn steps_per_epoch(&self) -> usize {
        self.increments.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_increments_cover_unit_interval() {
        assert_eq!(CyclicLrWithRestarts::epoch_increments(64, 32), vec![0.0, 0.5, 1.0]);
        let inc = CyclicLrWithRestarts::epoch_increments(70, 32);
        assert_eq!(inc.len(), 4);
        assert!(approx(inc[1], 1.0 / 3.0));
        assert_eq!(*inc.last().unwrap(), 1.0);
    }

    #[test]
    fn test_first_step_is_base_lr() {
        let mut s = CyclicLrWithRestarts::new(1e-4, 1e-4, 32, 64, 10, 2.0).unwrap();
        let first = s.step().unwrap();
        assert!(approx(first.lr, 1e-4));
        assert!(approx(first.weight_decay, 1e-4 * (32.0f64 / 640.0).sqrt()));
    }

    #[test]
    fn test_lr_stays_within_bounds_and_decays_in_cycle() {
        let mut s = CyclicLrWithRestarts::new(1e-3, 0.0, 32, 64, 4, 2.0).unwrap();
        let mut previous = f64::INFINITY;
        for epoch in 0..4 {
            let mut lrs = vec![s.step().unwrap().lr];
            lrs.push(s.batch_step().unwrap().lr);
            for lr in lrs {
                assert!(lr >= MIN_LR && lr <= 1e-3 + 1e-15, "epoch {epoch}: lr {lr}");
                assert!(lr <= previous, "lr increased inside a cycle");
                previous = lr;
            }
        }
    }

    #[test]
    fn test_restart_timing_and_period_growth() {
        let mut s = CyclicLrWithRestarts::new(1e-3, 0.0, 32, 64, 2, 2.0).unwrap();

        // Epochs 0 and 1 run inside the first period
        for _ in 0..2 {
            s.step().unwrap();
            s.batch_step().unwrap();
        }
        assert_eq!(s.restarts(), 0);

        // Epoch 2 wraps: restart, period doubles, lr back near base
        let wrapped = s.step().unwrap();
        assert_eq!(s.restarts(), 1);
        assert_eq!(s.restart_period(), 4);
        assert!(wrapped.lr < 1e-3 * 0.5);

        let after = s.batch_step().unwrap();
        assert!(after.lr > 0.9e-3, "lr {} after restart", after.lr);
    }

    #[test]
    fn test_too_many_batch_steps_fails() {
        let mut s = CyclicLrWithRestarts::new(1e-3, 0.0, 32, 64, 2, 2.0).unwrap();
        s.step().unwrap();
        assert_eq!(s.steps_per_epoch(), 3);
        s.batch_step().unwrap();
        s.batch_step().unwrap();
        assert!(s.batch_step().is_err());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(CyclicLrWithRestarts::new(1e-3, 0.0, 0, 64, 2, 2.0).is_err());
        assert!(CyclicLrWithRestarts::new(1e-3, 0.0, 32, 64, 0, 2.0).is_err());
        assert!(CyclicLrWithRestarts::new(1e-3, 0.0, 32, 64, 2, 0.5).is_err());
    }
}
