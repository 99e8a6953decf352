use crate::match_manager::MatchManager;
use log::*;
use matchclock_common::match_snapshot::MatchSnapshot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::{
    sync::watch,
    time::{Duration, Instant, timeout_at},
};

/// Calls `MatchManager::tick()` at a fixed interval while the match clock is running and
/// publishes a fresh snapshot after every tick
#[derive(Debug)]
pub struct ClockDriver {
    tm: Arc<Mutex<MatchManager>>,
    clock_running_receiver: watch::Receiver<bool>,
    tick_interval: Duration,
    snapshot_tx: watch::Sender<Option<MatchSnapshot>>,
}

impl ClockDriver {
    pub fn new(
        tm: Arc<Mutex<MatchManager>>,
        tick_interval: Duration,
    ) -> (Self, watch::Receiver<Option<MatchSnapshot>>) {
        let clock_running_receiver = lock(&tm).get_start_stop_rx();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        (
            Self {
                tm,
                clock_running_receiver,
                tick_interval,
                snapshot_tx,
            },
            snapshot_rx,
        )
    }

    /// Runs until the session's clock channel closes or nobody is listening for snapshots
    pub async fn run(mut self) {
        debug!("Driver started");
        let mut next_time = Some(Instant::now());

        loop {
            if let Some(next_time) = next_time {
                if next_time > Instant::now() {
                    match timeout_at(next_time, self.clock_running_receiver.changed()).await {
                        Err(_) => {}
                        Ok(Err(_)) => break,
                        Ok(Ok(())) => {
                            debug!(
                                "Received clock running message: {}",
                                *self.clock_running_receiver.borrow()
                            );
                        }
                    };
                } else if self.clock_running_receiver.has_changed().is_err() {
                    break;
                }
            } else {
                debug!("Awaiting a new clock running message");
                if self.clock_running_receiver.changed().await.is_err() {
                    break;
                }
            }
            let clock_running = *self.clock_running_receiver.borrow_and_update();

            let now = Instant::now();
            let snapshot = {
                let mut tm = lock(&self.tm);
                tm.tick(now);
                tm.generate_snapshot(now)
            };

            if self.snapshot_tx.send(Some(snapshot)).is_err() {
                debug!("No snapshot listeners left");
                break;
            }

            next_time = clock_running.then(|| now + self.tick_interval);
        }
        debug!("Driver stopped");
    }
}

/// Locks the session, recovering it if a previous holder panicked
pub fn lock(tm: &Mutex<MatchManager>) -> MutexGuard<'_, MatchManager> {
    tm.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::match_manager::{roster::RosterPlayer, test::initialize};
    use matchclock_common::match_snapshot::{
        CardKind, MatchClockState, PlayerId, PlayerPosition, PlayerStatus,
    };
    use tokio::time::sleep;

    fn player_status(tm: &Mutex<MatchManager>, id: u32) -> Option<PlayerStatus> {
        lock(tm).player(PlayerId(id)).map(|p| p.status)
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_completes_expulsion() {
        initialize();
        let start = Instant::now();
        let mut tm = MatchManager::new(Default::default());
        tm.add_player(RosterPlayer {
            id: PlayerId(7),
            shirt_number: 7,
            status: PlayerStatus::Starter,
            position: PlayerPosition::Defender,
        });
        tm.start_match(start);
        tm.issue_card(CardKind::White, Some(PlayerId(7)), start);
        let tm = Arc::new(Mutex::new(tm));

        let (driver, mut snapshot_rx) = ClockDriver::new(tm.clone(), Duration::from_secs(1));
        let handle = tokio::spawn(driver.run());

        sleep(Duration::from_millis(599_500)).await;
        assert_eq!(player_status(&tm, 7), Some(PlayerStatus::TemporarilyExpelled));
        let secs_remaining = snapshot_rx
            .borrow_and_update()
            .as_ref()
            .map(|s| s.temp_expulsions[0].secs_remaining);
        assert_eq!(secs_remaining, Some(1));

        sleep(Duration::from_secs(1)).await;
        assert_eq!(player_status(&tm, 7), Some(PlayerStatus::Starter));
        let snapshot = snapshot_rx.borrow_and_update().clone();
        assert_eq!(snapshot.map(|s| s.temp_expulsions.len()), Some(0));

        lock(&tm).end_period(Instant::now());
        sleep(Duration::from_secs(5)).await;
        let snapshot = snapshot_rx.borrow_and_update().clone();
        assert_eq!(
            snapshot.map(|s| s.clock_state),
            Some(MatchClockState::PeriodEnded)
        );

        // The driver waits for the clock instead of ticking
        sleep(Duration::from_secs(60)).await;
        assert!(!snapshot_rx.has_changed().unwrap());

        drop(snapshot_rx);
        lock(&tm).start_match(Instant::now());
        handle.await.unwrap();
    }
}
