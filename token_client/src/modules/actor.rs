use crate::modules::orchestrator::Orchestrator;
use crate::modules::protocol::{InputField, SessionSnapshot, TokenAction};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const COMMAND_CAP: usize = 32;

#[derive(Debug, Clone)]
pub enum UiCommand {
    Connect,
    Refresh,
    SetInput { field: InputField, value: String },
    Submit(TokenAction),
}

/// Presentation-side handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<UiCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub async fn send(&self, cmd: UiCommand) -> Result<(), String> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| "session actor unavailable".to_string())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Commands sent but not yet picked up by the actor.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Start the session on its own task. The actor runs `initialize` before reading commands.
pub fn spawn(orchestrator: Orchestrator) -> (SessionHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_CAP);
    let snapshots = orchestrator.subscribe();
    let join = tokio::spawn(run(orchestrator, rx));
    (SessionHandle { tx, snapshots }, join)
}

pub async fn run(mut orchestrator: Orchestrator, mut rx: mpsc::Receiver<UiCommand>) {
    orchestrator.initialize().await;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            UiCommand::Submit(action) => {
                let (deferred, closed) = submit_exclusive(&mut orchestrator, &mut rx, action).await;
                for cmd in deferred {
                    apply(&mut orchestrator, cmd).await;
                }
                if closed {
                    return;
                }
            }
            other => apply(&mut orchestrator, other).await,
        }
    }
}

async fn apply(orchestrator: &mut Orchestrator, cmd: UiCommand) {
    debug!(?cmd, "session command");
    match cmd {
        UiCommand::Connect => orchestrator.connect().await,
        UiCommand::Refresh => orchestrator.refresh().await,
        UiCommand::SetInput { field, value } => orchestrator.set_input(field, value),
        // Submits always go through `submit_exclusive`; deferred commands never hold one.
        UiCommand::Submit(action) => {
            warn!(%action, "submit outside the write path, ignoring");
        }
    }
}

// At most one write in flight: extra submits are dropped, everything else waits.
async fn submit_exclusive(
    orchestrator: &mut Orchestrator,
    rx: &mut mpsc::Receiver<UiCommand>,
    action: TokenAction,
) -> (Vec<UiCommand>, bool) {
    let mut deferred = Vec::new();
    let mut closed = false;

    let submit = orchestrator.submit(action);
    tokio::pin!(submit);

    loop {
        tokio::select! {
            _ = &mut submit => break,
            cmd = rx.recv(), if !closed => match cmd {
                Some(UiCommand::Submit(dup)) => {
                    warn!(in_flight = %action, ignored = %dup, "transaction already in flight, ignoring submit");
                }
                Some(other) => deferred.push(other),
                None => closed = true,
            },
        }
    }

    (deferred, closed)
}
