//! Background advisory computation.
//!
//! Runs the route search on its own thread and streams "best so far" notes
//! back over a bounded channel; the controller drains them on its own turn
//! of the event loop. Each worker carries a generation number: when a new
//! worker starts (or the relevant state is left) the old generation is
//! invalidated and any notes still in flight are ignored. A worker failure
//! is logged and suppressed; it never reaches the user or blocks dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::config::AdvisoryConfig;
use crate::search::{RouteEstimate, RouteRequest, RouteSearch};

/// Notes streamed from the worker to the controller.
#[derive(Clone, Debug)]
pub enum AdvisoryNote {
    BestSoFar {
        generation: u64,
        estimate: RouteEstimate,
    },
    Finished {
        generation: u64,
    },
}

impl AdvisoryNote {
    pub fn generation(&self) -> u64 {
        match self {
            AdvisoryNote::BestSoFar { generation, .. } => *generation,
            AdvisoryNote::Finished { generation } => *generation,
        }
    }
}

/// Handle to one running (or finished) worker instance.
pub struct AdvisoryHandle {
    generation: u64,
    cancel: Arc<AtomicBool>,
    rx: Receiver<AdvisoryNote>,
}

impl AdvisoryHandle {
    /// Spawn a worker for `request`. The thread is detached: cancellation is
    /// cooperative and the stale-generation guard makes joining unnecessary.
    pub fn spawn(
        generation: u64,
        request: RouteRequest,
        search: Arc<dyn RouteSearch>,
        config: &AdvisoryConfig,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, rx) = sync_channel(config.channel_capacity.max(1));

        let worker_cancel = Arc::clone(&cancel);
        thread::spawn(move || advisory_worker(generation, request, search, worker_cancel, tx));

        Self {
            generation,
            cancel,
            rx,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signal the worker to stop at its next cancellation point.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Non-blocking drain of pending notes.
    pub fn try_recv(&self) -> Option<AdvisoryNote> {
        match self.rx.try_recv() {
            Ok(note) => Some(note),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Drop for AdvisoryHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn advisory_worker(
    generation: u64,
    request: RouteRequest,
    search: Arc<dyn RouteSearch>,
    cancel: Arc<AtomicBool>,
    tx: SyncSender<AdvisoryNote>,
) {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let cancelled = || cancel.load(Ordering::Relaxed);
        let mut emit = |estimate: RouteEstimate| {
            // A full channel just drops the intermediate note; a later and
            // better one will follow, and the terminal flag is sent below.
            if tx
                .try_send(AdvisoryNote::BestSoFar {
                    generation,
                    estimate,
                })
                .is_err()
            {
                debug!("advisory channel full; dropping intermediate note");
            }
        };
        search.search(&request, &mut emit, &cancelled);
    }));

    if let Err(panic) = result {
        // The overlay simply never updates; decisions proceed without it.
        let text = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!("advisory worker failed: {}", text);
    }

    // The terminal flag must not be lost to a full channel: block until the
    // controller drains a slot. Err only means the handle was dropped.
    let _ = tx.send(AdvisoryNote::Finished { generation });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trunkline_protocol::{CompanyId, StopId};

    struct SlowSearch;

    impl RouteSearch for SlowSearch {
        fn search(
            &self,
            _request: &RouteRequest,
            emit: &mut dyn FnMut(RouteEstimate),
            cancelled: &dyn Fn() -> bool,
        ) {
            for value in [10, 20, 30] {
                if cancelled() {
                    return;
                }
                emit(RouteEstimate {
                    value,
                    stops: vec![StopId::new(0)],
                });
                thread::sleep(Duration::from_millis(5));
            }
        }
    }

    struct BurstSearch;

    impl RouteSearch for BurstSearch {
        fn search(
            &self,
            _request: &RouteRequest,
            emit: &mut dyn FnMut(RouteEstimate),
            _cancelled: &dyn Fn() -> bool,
        ) {
            for value in [10, 20, 30, 40, 50] {
                emit(RouteEstimate {
                    value,
                    stops: vec![StopId::new(0)],
                });
            }
        }
    }

    struct PanickingSearch;

    impl RouteSearch for PanickingSearch {
        fn search(
            &self,
            _request: &RouteRequest,
            _emit: &mut dyn FnMut(RouteEstimate),
            _cancelled: &dyn Fn() -> bool,
        ) {
            panic!("route reconstruction exploded");
        }
    }

    fn request() -> RouteRequest {
        RouteRequest {
            company: CompanyId(0),
            stop_values: Vec::new(),
            train_capacities: Vec::new(),
        }
    }

    fn drain_until_finished(handle: &AdvisoryHandle) -> Vec<AdvisoryNote> {
        let mut notes = Vec::new();
        for _ in 0..200 {
            while let Some(note) = handle.try_recv() {
                let finished = matches!(note, AdvisoryNote::Finished { .. });
                notes.push(note);
                if finished {
                    return notes;
                }
            }
            thread::sleep(Duration::from_millis(2));
        }
        notes
    }

    #[test]
    fn worker_streams_bests_then_final_flag() {
        let handle = AdvisoryHandle::spawn(
            1,
            request(),
            Arc::new(SlowSearch),
            &AdvisoryConfig::default(),
        );
        let notes = drain_until_finished(&handle);
        let bests = notes
            .iter()
            .filter(|n| matches!(n, AdvisoryNote::BestSoFar { .. }))
            .count();
        assert_eq!(bests, 3);
        assert!(matches!(
            notes.last(),
            Some(AdvisoryNote::Finished { generation: 1 })
        ));
    }

    /// Intermediate notes may drop when the channel is full, but the
    /// terminal flag always arrives.
    #[test]
    fn final_flag_survives_a_full_channel() {
        let config = AdvisoryConfig {
            channel_capacity: 1,
            ..AdvisoryConfig::default()
        };
        let handle = AdvisoryHandle::spawn(3, request(), Arc::new(BurstSearch), &config);
        let notes = drain_until_finished(&handle);
        assert!(matches!(
            notes.last(),
            Some(AdvisoryNote::Finished { generation: 3 })
        ));
    }

    #[test]
    fn panic_is_swallowed_and_still_finishes() {
        let handle = AdvisoryHandle::spawn(
            7,
            request(),
            Arc::new(PanickingSearch),
            &AdvisoryConfig::default(),
        );
        let notes = drain_until_finished(&handle);
        assert!(notes
            .iter()
            .all(|n| matches!(n, AdvisoryNote::Finished { generation: 7 })));
    }

    #[test]
    fn cancellation_cuts_the_stream_short() {
        let handle = AdvisoryHandle::spawn(
            2,
            request(),
            Arc::new(SlowSearch),
            &AdvisoryConfig::default(),
        );
        handle.cancel();
        let notes = drain_until_finished(&handle);
        let bests = notes
            .iter()
            .filter(|n| matches!(n, AdvisoryNote::BestSoFar { .. }))
            .count();
        assert!(bests < 3);
    }
}
