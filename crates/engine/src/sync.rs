use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use stormview_client::Transport;
use stormview_common::{DEFAULT_RESYNC_SECS, DEFAULT_TICK_MS, EngineError};

use crate::countdown::Countdown;
use crate::hydrator::Hydrator;
use crate::snapshot::Snapshot;

/// Parâmetros do engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Período do tick local.
    pub tick: Duration,
    /// Intervalo do resync periódico com o servidor.
    pub resync: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            resync: Duration::from_secs(DEFAULT_RESYNC_SECS),
        }
    }
}

/// Resultado de um refresh que terminou sem erro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Snapshot publicado com `n` chaves.
    Applied(usize),
    /// Um refresh mais novo foi emitido antes deste terminar; descartado.
    Superseded,
}

/// Junta hidratação e contagem local: cada refresh concluído substitui o
/// snapshot do [`Countdown`], desde que seja o mais recente emitido.
pub struct PreviewSync<T> {
    hydrator: Hydrator<T>,
    countdown: Countdown,
    latest: AtomicU64,
    apply: Mutex<()>,
    /// Mensagem do último refresh publicado que falhou; `None` após um sucesso.
    error: watch::Sender<Option<String>>,
    resync: Duration,
}

impl<T: Transport> PreviewSync<T> {
    pub fn new(transport: Arc<T>, config: &EngineConfig) -> Self {
        Self {
            hydrator: Hydrator::new(transport),
            countdown: Countdown::new(config.tick),
            latest: AtomicU64::new(0),
            apply: Mutex::new(()),
            error: watch::channel(None).0,
            resync: config.resync,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.countdown.subscribe()
    }

    /// Erro do refresh mais recente, pronto para exibir ao usuário.
    pub fn errors(&self) -> watch::Receiver<Option<String>> {
        self.error.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.countdown.current()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    /// Hidrata tudo e publica o snapshot.
    ///
    /// Se a enumeração falhar, publica um snapshot vazio e devolve
    /// [`EngineError::Enumeration`].
    pub async fn refresh(&self) -> Result<RefreshOutcome, EngineError> {
        let seq = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("refresh #{seq} iniciado");

        match self.hydrator.refresh().await {
            Ok(snapshot) => {
                let keys = snapshot.len();
                if self.apply(seq, snapshot) {
                    self.publish_error(None);
                    debug!("refresh #{seq} publicado ({keys} chaves)");
                    Ok(RefreshOutcome::Applied(keys))
                } else {
                    debug!("refresh #{seq} obsoleto, descartado");
                    Ok(RefreshOutcome::Superseded)
                }
            }
            Err(e) => {
                if self.apply(seq, Snapshot::empty()) {
                    warn!("refresh #{seq} falhou: {e}");
                    self.publish_error(Some(e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Substitui o snapshot só se `seq` ainda for o último emitido.
    fn apply(&self, seq: u64, snapshot: Snapshot) -> bool {
        let _guard = match self.apply.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.latest.load(Ordering::Acquire) != seq {
            return false;
        }
        self.countdown.replace(snapshot);
        true
    }

    fn publish_error(&self, error: Option<String>) {
        self.error.send_if_modified(|current| {
            if *current == error {
                return false;
            }
            *current = error;
            true
        });
    }

    /// Re-sincroniza com o servidor periodicamente, começando imediatamente.
    pub fn spawn_resync(self: &Arc<Self>) -> JoinHandle<()> {
        let sync = Arc::clone(self);
        let every = self.resync;
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = sync.refresh().await {
                    warn!("resync periódico falhou: {e}");
                }
            }
        })
    }
}
