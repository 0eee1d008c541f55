use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::debug;

use crate::snapshot::Snapshot;

/// Dono do snapshot local e do único timer que aproxima os TTLs.
///
/// Toda escrita substitui o snapshot inteiro dentro do `watch`, então quem
/// observa nunca vê um estado parcial.
pub struct Countdown {
    tx: Arc<watch::Sender<Snapshot>>,
    /// Incrementado a cada substituição; timers de épocas antigas não tocam
    /// no snapshot novo.
    epoch: Arc<AtomicU64>,
    timer: Mutex<Option<JoinHandle<()>>>,
    period: Duration,
}

impl Countdown {
    pub fn new(period: Duration) -> Self {
        let (tx, _) = watch::channel(Snapshot::empty());
        Self {
            tx: Arc::new(tx),
            epoch: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            period,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn is_ticking(&self) -> bool {
        self.timer
            .lock()
            .map(|timer| timer.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Instala um snapshot novo: derruba o timer atual e cria outro se houver
    /// algum TTL positivo.
    pub fn replace(&self, snapshot: Snapshot) {
        let mut timer = match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let counting = snapshot.has_countdown();
        self.tx.send_replace(snapshot);

        if counting {
            debug!("timer de contagem instalado (época {epoch})");
            *timer = Some(tokio::spawn(run_timer(
                Arc::clone(&self.tx),
                Arc::clone(&self.epoch),
                epoch,
                self.period,
            )));
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock()
            && let Some(handle) = timer.take()
        {
            handle.abort();
        }
    }
}

async fn run_timer(
    tx: Arc<watch::Sender<Snapshot>>,
    epoch: Arc<AtomicU64>,
    mine: u64,
    period: Duration,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;

        let mut stale = false;
        let mut pending = false;
        tx.send_if_modified(|snapshot| {
            if epoch.load(Ordering::Acquire) != mine {
                stale = true;
                return false;
            }
            let next = snapshot.ticked();
            pending = next.has_pending();
            let changed = next != *snapshot;
            *snapshot = next;
            changed
        });

        if stale || !pending {
            debug!("timer de contagem encerrado (época {mine})");
            return;
        }
    }
}
