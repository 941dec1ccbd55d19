use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

/// Handle to a periodic background job. Dropping it leaves the job running;
/// call [`ScheduledJob::cancel`] to stop it.
pub struct ScheduledJob {
    handle: JoinHandle<()>,
}

impl ScheduledJob {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Runs `task` every `period`, first after one full period.
///
/// A run that overruns the period delays the next one instead of bursting.
pub fn schedule_repeating<F, Fut>(period: Duration, mut task: F) -> ScheduledJob
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            task().await;
        }
    });
    ScheduledJob { handle }
}
