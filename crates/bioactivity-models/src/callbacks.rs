//! Epoch-end training callbacks.

/// Stop once the monitored loss has not improved for `patience` consecutive epochs.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    wait: usize,
    best: f32,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self {
            patience,
            min_delta: 0.0,
            wait: 0,
            best: f32::INFINITY,
        }
    }

    /// Lowest value seen so far.
    pub fn best(&self) -> f32 {
        self.best
    }

    /// Record an epoch; returns `true` when training should stop.
    pub fn step(&mut self, current: f32) -> bool {
        if current - self.min_delta < self.best {
            self.best = current;
            self.wait = 0;
            false
        } else {
            self.wait += 1;
            self.wait >= self.patience
        }
    }
}

/// Multiply the learning rate by `factor` when the monitored loss plateaus.
///
/// A plateau is checked before the wait counter advances, so with `patience = 2.5` the
/// first reduction lands on the fourth epoch without an improvement larger than
/// `min_delta`.
#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    patience: f32,
    factor: f64,
    min_delta: f32,
    min_lr: f64,
    wait: usize,
    best: f32,
}

impl ReduceLrOnPlateau {
    pub fn new(patience: f32, factor: f64, min_delta: f32, min_lr: f64) -> Self {
        Self {
            patience,
            factor,
            min_delta,
            min_lr,
            wait: 0,
            best: f32::INFINITY,
        }
    }

    /// Record an epoch; returns the new learning rate when it should change.
    pub fn step(&mut self, current: f32, lr: f64) -> Option<f64> {
        if current < self.best - self.min_delta {
            self.best = current;
            self.wait = 0;
            return None;
        }
        let mut new_lr = None;
        if self.wait as f32 >= self.patience && lr > self.min_lr {
            new_lr = Some((lr * self.factor).max(self.min_lr));
            self.wait = 0;
        }
        self.wait += 1;
        new_lr
    }
}
