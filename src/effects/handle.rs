//! Messaging surface of the coordinator actor.

use super::error::CoordinatorError;
use crate::core::{Stage, StateTransition};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum FlowCommand {
    /// `None` runs the leg of the current stage.
    Request {
        stage: Option<Stage>,
        reply: Option<Reply<Result<(), CoordinatorError>>>,
    },
    Finished,
    History(Reply<Vec<StateTransition<Stage>>>),
    Shutdown,
}

/// Receiving side handed to `StageCoordinator::new`.
pub struct FlowInbox {
    pub(crate) commands: mpsc::UnboundedReceiver<FlowCommand>,
    pub(crate) sender: mpsc::UnboundedSender<FlowCommand>,
    pub(crate) stage: watch::Sender<Stage>,
}

/// Create the command channel and stage watch for a coordinator.
///
/// The handle exists before the coordinator so that collaborators needing
/// it (payment, handlers) can be built first and injected afterwards.
pub fn flow_channel(initial: Stage) -> (CoordinatorHandle, FlowInbox) {
    let (sender, commands) = mpsc::unbounded_channel();
    let (stage_tx, stage_rx) = watch::channel(initial);
    let handle = CoordinatorHandle {
        commands: sender.clone(),
        stage: stage_rx,
    };
    let inbox = FlowInbox {
        commands,
        sender,
        stage: stage_tx,
    };
    (handle, inbox)
}

/// Cloneable handle to a running `StageCoordinator`.
#[derive(Clone, Debug)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<FlowCommand>,
    stage: watch::Receiver<Stage>,
}

impl CoordinatorHandle {
    /// Set the stage to `stage` and start the transition effect.
    ///
    /// Fire-and-forget: rejections are logged by the coordinator.
    pub fn request_transition(&self, stage: Stage) -> Result<(), CoordinatorError> {
        self.send(FlowCommand::Request {
            stage: Some(stage),
            reply: None,
        })
    }

    /// Like `request_transition`, but waits for the coordinator's verdict.
    pub async fn try_request_transition(&self, stage: Stage) -> Result<(), CoordinatorError> {
        self.request_with_reply(Some(stage)).await
    }

    /// Run the leg of the current stage.
    pub fn advance(&self) -> Result<(), CoordinatorError> {
        self.send(FlowCommand::Request {
            stage: None,
            reply: None,
        })
    }

    pub async fn try_advance(&self) -> Result<(), CoordinatorError> {
        self.request_with_reply(None).await
    }

    /// Deliver a `Finished` event from an effect driven outside the crate.
    pub fn finished(&self) -> Result<(), CoordinatorError> {
        self.send(FlowCommand::Finished)
    }

    pub fn stage(&self) -> Stage {
        *self.stage.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage.clone()
    }

    /// Wait until the published stage equals `target`.
    pub async fn wait_for(&self, target: Stage) -> Result<(), CoordinatorError> {
        let mut rx = self.stage.clone();
        loop {
            if *rx.borrow_and_update() == target {
                return Ok(());
            }
            rx.changed().await.map_err(|_| CoordinatorError::Closed)?;
        }
    }

    pub async fn history(&self) -> Result<Vec<StateTransition<Stage>>, CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.send(FlowCommand::History(tx))?;
        rx.await.map_err(|_| CoordinatorError::Closed)
    }

    pub fn shutdown(&self) {
        if self.send(FlowCommand::Shutdown).is_err() {
            debug!("coordinator already stopped");
        }
    }

    async fn request_with_reply(&self, stage: Option<Stage>) -> Result<(), CoordinatorError> {
        let (tx, rx) = oneshot::channel();
        self.send(FlowCommand::Request {
            stage,
            reply: Some(tx),
        })?;
        rx.await.map_err(|_| CoordinatorError::Closed)?
    }

    fn send(&self, command: FlowCommand) -> Result<(), CoordinatorError> {
        self.commands
            .send(command)
            .map_err(|_| CoordinatorError::Closed)
    }
}
