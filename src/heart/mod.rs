// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The heartbeat liveness monitor.
//!
//! Grounded on `dds::writer::heartbeat_scheduler`'s dedicated-thread pattern
//! (`sleep(period)` loop behind a `should_stop` flag, a handle that signals
//! and joins on drop), generalized from a single outstanding writer to an
//! arbitrary set of monitored identities held in a [`DashMap`] of miss
//! counters, and from a fixed RTPS payload to the two-operation
//! [`HeartbeatCallback`] capability (`beat`/`dead`) spec.md §4.5 and §9
//! call for.

use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::debug;
use num_bigint::BigUint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use parking_lot::Mutex;

/// The two events a monitored host receives: a periodic tick, and a
/// once-only failure notification for an identity that missed `killCount`
/// consecutive pings.
pub trait HeartbeatCallback: Send + Sync {
    /// Called once per period with no identity; the recipient's cue to send
    /// outbound pings to whatever it is monitoring.
    fn beat(&self);
    /// Called exactly once per death. `id` is removed from the monitored set
    /// before this fires and may be `Monitor`-ed again afterward.
    fn dead(&self, id: &BigUint);
}

/// A periodic beater tracking per-identity miss counters. `Monitor`,
/// `Unmonitor`, and `Ping` are legal at any point in the beater's lifetime
/// (before `Start`, while running, and after `Terminate`); `Start` and
/// `Terminate` are each one-shot.
pub struct Heartbeat {
    counters: Arc<DashMap<BigUint, u32>>,
    callback: Arc<dyn HeartbeatCallback>,
    period: Duration,
    kill_count: u32,
    started: AtomicBool,
    terminated: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    /// Builds a new, unstarted beater. No callback fires until [`Heartbeat::start`].
    pub fn new(period: Duration, kill_count: u32, callback: Arc<dyn HeartbeatCallback>) -> Self {
        Self {
            counters: Arc::new(DashMap::new()),
            callback,
            period,
            kill_count,
            started: AtomicBool::new(false),
            terminated: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
        }
    }

    /// Adds `id` with a miss counter of 0.
    pub fn monitor(&self, id: BigUint) -> Result<()> {
        match self.counters.entry(id) {
            Entry::Occupied(_) => Err(Error::InvalidState("id already monitored".into())),
            Entry::Vacant(slot) => {
                slot.insert(0);
                Ok(())
            }
        }
    }

    /// Removes `id` from the monitored set.
    pub fn unmonitor(&self, id: &BigUint) -> Result<()> {
        self.counters
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidState("id not monitored".into()))
    }

    /// Resets `id`'s miss counter to 0.
    pub fn ping(&self, id: &BigUint) -> Result<()> {
        match self.counters.get_mut(id) {
            Some(mut counter) => {
                *counter = 0;
                Ok(())
            }
            None => Err(Error::InvalidState("id not monitored".into())),
        }
    }

    /// Starts the ticker thread. One-shot: a second call returns
    /// [`Error::InvalidState`] without touching the running ticker.
    pub fn start(&self) -> Result<()> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvalidState("heartbeat already started".into()));
        }
        let counters = Arc::clone(&self.counters);
        let callback = Arc::clone(&self.callback);
        let terminated = Arc::clone(&self.terminated);
        let period = self.period;
        let kill_count = self.kill_count;

        let handle = thread::Builder::new()
            .name("iris-heartbeat".into())
            .spawn(move || tick_loop(counters, callback, terminated, period, kill_count))
            .expect("failed to spawn heartbeat thread");
        *self.thread.lock() = Some(handle);
        Ok(())
    }

    /// Stops the ticker, waiting for any in-flight tick to finish. One-shot:
    /// a second call returns [`Error::InvalidState`].
    pub fn terminate(&self) -> Result<()> {
        if self
            .terminated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::InvalidState("heartbeat already terminated".into()));
        }
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.terminated.store(true, Ordering::Release);
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

fn tick_loop(
    counters: Arc<DashMap<BigUint, u32>>,
    callback: Arc<dyn HeartbeatCallback>,
    terminated: Arc<AtomicBool>,
    period: Duration,
    kill_count: u32,
) {
    debug!("heartbeat ticker starting (period={period:?}, kill={kill_count})");
    while !terminated.load(Ordering::Acquire) {
        thread::sleep(period);
        if terminated.load(Ordering::Acquire) {
            break;
        }

        callback.beat();

        // DashMap's iterator holds per-shard locks; collect ids first so the
        // increment/remove pass below never mutates under its own read guard.
        let ids: Vec<BigUint> = counters.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            let is_dead = match counters.get_mut(&id) {
                Some(mut counter) => {
                    *counter += 1;
                    *counter >= kill_count
                }
                None => false,
            };
            if is_dead {
                counters.remove(&id);
                callback.dead(&id);
            }
        }
    }
    debug!("heartbeat ticker stopped");
}
