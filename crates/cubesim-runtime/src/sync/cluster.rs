use std::sync::atomic::{AtomicU32, Ordering};

const SPIN_LIMIT: u32 = 64;

/// Single generation arrive/wait barrier shared by the planes of a cluster.
///
/// A fresh barrier is created for every cluster of every launch. Every plane of every cube
/// in the cluster arrives once; [wait](ClusterBarrier::wait) returns once all of them did.
/// A participant that never arrives makes every waiter spin forever.
#[derive(Debug)]
pub struct ClusterBarrier {
    arrived: AtomicU32,
    expected: u32,
}

/// Proof that the holder arrived at a [cluster barrier](ClusterBarrier).
#[derive(Debug)]
#[must_use = "an arrival token should be handed to `wait`"]
pub struct ArrivalToken {
    _private: (),
}

impl ClusterBarrier {
    /// Creates a barrier expecting `expected` arrivals.
    pub fn new(expected: u32) -> Self {
        Self {
            arrived: AtomicU32::new(0),
            expected,
        }
    }

    /// Number of arrivals needed to release the barrier.
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Number of arrivals so far.
    pub fn arrived(&self) -> u32 {
        self.arrived.load(Ordering::Acquire)
    }

    /// Whether every participant arrived.
    pub fn is_released(&self) -> bool {
        self.arrived() >= self.expected
    }

    /// Signals that the caller finished its local phase. Never blocks.
    ///
    /// Writes made before arriving are visible to every participant after its `wait`.
    pub fn arrive(&self) -> ArrivalToken {
        let previous = self.arrived.fetch_add(1, Ordering::AcqRel);
        if previous >= self.expected {
            log::warn!(
                "Cluster barrier received {} arrivals, expected {}",
                previous + 1,
                self.expected
            );
        }
        ArrivalToken { _private: () }
    }

    /// Blocks until every participant arrived.
    pub fn wait(&self, _token: ArrivalToken) {
        let mut iteration = 0;
        while !self.is_released() {
            if iteration < SPIN_LIMIT {
                core::hint::spin_loop();
                iteration += 1;
            } else {
                std::thread::yield_now();
            }
        }
    }

    /// Arrives then waits.
    pub fn arrive_and_wait(&self) {
        let token = self.arrive();
        self.wait(token);
    }
}
