use std::time::Instant;

use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::navigation::{Completion, RequestTicket};
use crate::transport::Transport;

/// Sends tickets through a [`Transport`] and classifies what comes back.
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    classifier: Classifier,
}

impl<T: Transport> Session<T> {
    #[must_use]
    pub fn new(transport: T, classifier: Classifier) -> Self {
        Self {
            transport,
            classifier,
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub async fn execute(&self, ticket: RequestTicket) -> Completion {
        let started_at = Instant::now();
        let endpoint = ticket.request.endpoint;
        let result = self
            .transport
            .send(&ticket.request)
            .await
            .map(|response| self.classifier.classify(endpoint, &response));

        match &result {
            Ok(outcome) => debug!(
                path = endpoint.path(),
                outcome = outcome.label(),
                elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request completed"
            ),
            Err(error) => warn!(path = endpoint.path(), %error, "request failed"),
        }

        Completion { ticket, result }
    }
}
