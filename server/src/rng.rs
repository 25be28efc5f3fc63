//! Random sources.
//!
//! Generation uses a seedable `ChaCha8Rng` passed in explicitly. Every roll
//! that decides a combat outcome goes through a `RollSource`, so tests can
//! script them and live sessions can audit them.

use std::collections::VecDeque;

use log::trace;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of rolls an `AuditedRolls` keeps for inspection
const AUDIT_WINDOW: usize = 64;

/// Reproducible generator for arena layouts and spawns
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Unseeded generator, used when no seed was requested
pub fn entropy_rng() -> ChaCha8Rng {
    ChaCha8Rng::from_entropy()
}

/// What a roll is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollKind {
    Dodge,
    Block,
    Crit,
    Variance,
    Wander,
    Loot,
}

/// Source of outcome-affecting rolls, uniform in [0, 1)
pub trait RollSource {
    fn roll(&mut self, kind: RollKind) -> f32;

    /// Uniform roll mapped into [lo, hi)
    fn roll_range(&mut self, kind: RollKind, lo: f32, hi: f32) -> f32 {
        lo + self.roll(kind) * (hi - lo)
    }
}

/// A single recorded roll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollRecord {
    pub seq: u64,
    pub kind: RollKind,
    pub value: f32,
}

/// Wraps any RNG and records what it produced
pub struct AuditedRolls<R> {
    rng: R,
    count: u64,
    recent: VecDeque<RollRecord>,
}

impl<R: RngCore> AuditedRolls<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            count: 0,
            recent: VecDeque::with_capacity(AUDIT_WINDOW),
        }
    }

    /// Total rolls made so far
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Most recent rolls, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &RollRecord> {
        self.recent.iter()
    }
}

impl AuditedRolls<ChaCha8Rng> {
    pub fn from_entropy() -> Self {
        Self::new(entropy_rng())
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(seeded_rng(seed))
    }
}

impl<R: RngCore> RollSource for AuditedRolls<R> {
    fn roll(&mut self, kind: RollKind) -> f32 {
        let value: f32 = self.rng.gen();
        self.count += 1;
        trace!("[ROLL] #{} {:?} = {:.4}", self.count, kind, value);

        if self.recent.len() == AUDIT_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(RollRecord {
            seq: self.count,
            kind,
            value,
        });
        value
    }
}

/// Replays queued values, then a fixed fallback forever
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    queue: VecDeque<f32>,
    fallback: f32,
}

impl ScriptedRolls {
    pub fn new(values: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            queue: values.into_iter().collect(),
            fallback,
        }
    }

    /// 0.5 on every roll: no dodge, block, crit or wander and zero variance
    pub fn neutral() -> Self {
        Self::new(Vec::new(), 0.5)
    }

    pub fn push(&mut self, value: f32) {
        self.queue.push_back(value);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl RollSource for ScriptedRolls {
    fn roll(&mut self, _kind: RollKind) -> f32 {
        self.queue.pop_front().unwrap_or(self.fallback)
    }
}
