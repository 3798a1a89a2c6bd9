//! Named fan-out of async tasks with a join barrier and a shared deadline.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, RetrievalError};

/// A group of named tasks that are joined together.
///
/// Every task observes the group's [`CancellationToken`]. When the optional
/// deadline passes, the token is cancelled and every outstanding task reports
/// [`RetrievalError::Cancelled`].
pub struct TaskGroup<T> {
    tasks: JoinSet<(String, Result<T>)>,
    names: HashSet<String>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl<T: Send + 'static> TaskGroup<T> {
    pub fn new() -> Self {
        Self {
            tasks: JoinSet::new(),
            names: HashSet::new(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Cancel all outstanding tasks once `timeout` has passed from now.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            ..Self::new()
        }
    }

    /// Token shared by every task in the group
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawn `future` under `name`. Names must be unique within the group.
    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> Result<()>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(RetrievalError::invalid("task name", name));
        }

        let cancel = self.cancel.clone();
        self.tasks.spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(RetrievalError::Cancelled),
                outcome = future => outcome,
            };
            (name, outcome)
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Wait for every task and return each one's outcome by name.
    ///
    /// Tasks that panicked are reported as [`RetrievalError::TaskFailed`].
    pub async fn join(mut self) -> HashMap<String, Result<T>> {
        let mut outcomes = HashMap::with_capacity(self.names.len());

        loop {
            let next = match self.deadline {
                Some(deadline) if !self.cancel.is_cancelled() => {
                    match tokio::time::timeout_at(deadline, self.tasks.join_next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            warn!(
                                outstanding = self.tasks.len(),
                                "Task group deadline elapsed, cancelling"
                            );
                            self.cancel.cancel();
                            continue;
                        }
                    }
                }
                _ => self.tasks.join_next().await,
            };

            match next {
                Some(Ok((name, outcome))) => {
                    debug!(task = %name, ok = outcome.is_ok(), "Task finished");
                    outcomes.insert(name, outcome);
                }
                Some(Err(e)) => warn!("Task failed to complete: {}", e),
                None => break,
            }
        }

        for name in self.names {
            if !outcomes.contains_key(&name) {
                outcomes.insert(name.clone(), Err(RetrievalError::TaskFailed(name)));
            }
        }

        outcomes
    }
}

impl<T: Send + 'static> Default for TaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}
