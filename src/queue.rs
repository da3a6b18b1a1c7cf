// FIFO job queue with a bounded-concurrency gate

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

/// Executes one job to completion. Implemented by the pipeline; tests swap
/// in their own runners.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, job_id: String);
}

struct QueueState {
    pending: VecDeque<String>,
    in_flight: usize,
}

struct Inner {
    limit: usize,
    runner: Arc<dyn JobRunner>,
    state: Mutex<QueueState>,
}

/// Admits queued job ids strictly in FIFO order, never letting more than
/// `limit` run at once. A finishing job frees its slot and re-drives the
/// queue, so it keeps draining on its own. Cheap to clone.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(limit: usize, runner: Arc<dyn JobRunner>) -> Self {
        Self {
            inner: Arc::new(Inner {
                limit: limit.max(1),
                runner,
                state: Mutex::new(QueueState {
                    pending: VecDeque::new(),
                    in_flight: 0,
                }),
            }),
        }
    }

    pub fn enqueue(&self, job_id: String) {
        self.inner.state.lock().pending.push_back(job_id);
        drive(&self.inner);
    }

    /// Jobs currently executing.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().in_flight
    }
}

/// Admit the next pending job if a slot is free. No-op otherwise;
/// a later completion will call this again.
fn drive(inner: &Arc<Inner>) {
    let job_id = {
        let mut state = inner.state.lock();
        if state.in_flight >= inner.limit {
            return;
        }
        match state.pending.pop_front() {
            Some(id) => {
                state.in_flight += 1;
                id
            }
            None => return,
        }
    };

    debug!(job = %job_id, "admitting job");
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        // The guard frees the slot even if the runner panics; a wedged
        // queue would otherwise stop admitting jobs forever.
        let _slot = SlotGuard(Arc::clone(&inner));
        inner.runner.run(job_id).await;
    });
}

struct SlotGuard(Arc<Inner>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.state.lock().in_flight -= 1;
        drive(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    /// Records (start, end) events per job and how many ran at once.
    struct ProbeRunner {
        events: Mutex<Vec<String>>,
        active: Mutex<usize>,
        peak: Mutex<usize>,
        delay: Duration,
    }

    impl ProbeRunner {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
                active: Mutex::new(0),
                peak: Mutex::new(0),
                delay,
            })
        }
    }

    #[async_trait]
    impl JobRunner for ProbeRunner {
        async fn run(&self, job_id: String) {
            {
                let mut active = self.active.lock();
                *active += 1;
                let mut peak = self.peak.lock();
                *peak = (*peak).max(*active);
            }
            self.events.lock().push(format!("start:{}", job_id));
            sleep(self.delay).await;
            self.events.lock().push(format!("end:{}", job_id));
            *self.active.lock() -= 1;
        }
    }

    #[tokio::test]
    async fn limit_one_serializes_jobs_in_fifo_order() {
        let runner = ProbeRunner::new(Duration::from_millis(30));
        let scheduler = Scheduler::new(1, runner.clone());

        scheduler.enqueue("a".to_string());
        scheduler.enqueue("b".to_string());
        scheduler.enqueue("c".to_string());

        sleep(Duration::from_millis(300)).await;

        let events = runner.events.lock().clone();
        assert_eq!(
            events,
            vec!["start:a", "end:a", "start:b", "end:b", "start:c", "end:c"]
        );
        assert_eq!(*runner.peak.lock(), 1);
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() {
        let runner = ProbeRunner::new(Duration::from_millis(40));
        let scheduler = Scheduler::new(2, runner.clone());

        for i in 0..5 {
            scheduler.enqueue(format!("job{}", i));
        }

        sleep(Duration::from_millis(400)).await;

        assert!(*runner.peak.lock() <= 2);
        assert_eq!(runner.events.lock().len(), 10);
    }

    /// Panics on the job named "boom", records everything else.
    struct FlakyRunner {
        events: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobRunner for FlakyRunner {
        async fn run(&self, job_id: String) {
            if job_id == "boom" {
                panic!("runner blew up");
            }
            self.events.lock().push(job_id);
        }
    }

    #[tokio::test]
    async fn panicking_runner_does_not_leak_its_slot() {
        let runner = Arc::new(FlakyRunner {
            events: Mutex::new(Vec::new()),
        });
        let scheduler = Scheduler::new(1, runner.clone());

        scheduler.enqueue("boom".to_string());
        scheduler.enqueue("after".to_string());

        sleep(Duration::from_millis(100)).await;

        assert_eq!(*runner.events.lock(), vec!["after"]);
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[tokio::test]
    async fn zero_limit_is_clamped_to_one() {
        let runner = ProbeRunner::new(Duration::from_millis(5));
        let scheduler = Scheduler::new(0, runner.clone());
        scheduler.enqueue("a".to_string());
        sleep(Duration::from_millis(100)).await;
        assert_eq!(runner.events.lock().len(), 2);
    }
}
