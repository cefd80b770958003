// src/services/answer_writer.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{models::id::ExternalId, services::exam_service::ExamService};

type QueueKey = (ExternalId, ExternalId);

enum WriteCommand {
    Save { token: String, answer: Value },
    Flush(oneshot::Sender<()>),
}

/// Forwards answer writes to the exam service, one FIFO queue per question.
///
/// Writes for the same question reach the service in the order they were
/// enqueued, so a stale answer can never land after a newer one. Writes for
/// different questions proceed independently.
///
/// `enqueue` is synchronous so callers can queue a write while still holding
/// the lock under which the answer was recorded; the two orders then agree.
pub struct AnswerWriter {
    service: Arc<dyn ExamService>,
    queues: Mutex<HashMap<QueueKey, mpsc::UnboundedSender<WriteCommand>>>,
}

impl AnswerWriter {
    pub fn new(service: Arc<dyn ExamService>) -> Self {
        Self {
            service,
            queues: Mutex::new(HashMap::new()),
        }
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<QueueKey, mpsc::UnboundedSender<WriteCommand>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a write and returns immediately. Must be called from within the
    /// tokio runtime.
    pub fn enqueue(
        &self,
        token: String,
        submission_id: ExternalId,
        question_id: ExternalId,
        answer: Value,
    ) {
        let mut queues = self.queues();
        let key = (submission_id, question_id);

        let command = WriteCommand::Save { token, answer };
        let command = match queues.get(&key) {
            Some(sender) => match sender.send(command) {
                Ok(()) => return,
                Err(mpsc::error::SendError(command)) => command,
            },
            None => command,
        };

        let (sender, receiver) = mpsc::unbounded_channel();
        // A fresh receiver is held right here, so this send cannot fail.
        let _ = sender.send(command);
        tokio::spawn(drain(
            self.service.clone(),
            key.0.clone(),
            key.1.clone(),
            receiver,
        ));
        queues.insert(key, sender);
    }

    /// Waits until every write queued so far for `submission_id` has been attempted.
    pub async fn flush(&self, submission_id: &ExternalId) {
        let acks: Vec<oneshot::Receiver<()>> = {
            let queues = self.queues();
            queues
                .iter()
                .filter(|((sid, _), _)| sid == submission_id)
                .filter_map(|(_, sender)| {
                    let (ack, done) = oneshot::channel();
                    sender.send(WriteCommand::Flush(ack)).ok().map(|_| done)
                })
                .collect()
        };

        for done in acks {
            let _ = done.await;
        }
    }

    /// Drops the queues of a submission; their workers exit once drained.
    pub fn close(&self, submission_id: &ExternalId) {
        self.queues().retain(|(sid, _), _| sid != submission_id);
    }
}

async fn drain(
    service: Arc<dyn ExamService>,
    submission_id: ExternalId,
    question_id: ExternalId,
    mut receiver: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = receiver.recv().await {
        match command {
            WriteCommand::Save { token, answer } => {
                if let Err(e) = service
                    .save_answer(&token, &submission_id, &question_id, &answer)
                    .await
                {
                    tracing::warn!(
                        "Failed to save answer for submission {} question {}: {}",
                        submission_id,
                        question_id,
                        e
                    );
                }
            }
            WriteCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    tracing::debug!("Answer queue closed for {}/{}", submission_id, question_id);
}
