//! Error taxonomy for the batched cache client.
//!
//! Retryable and terminal faults are distinct variants, so the retry loop
//! classifies by type instead of inspecting messages. Errors are `Clone`: a
//! sub-batch that fails as a whole fans its error out to every key slot it
//! covered.

use std::time::Duration;

use thiserror::Error;

use super::endpoint::Endpoint;
use crate::codec::CodecError;

/// Errors raised by the batched cache client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Connection establishment exceeded the connect timeout.
    #[error("connect to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout {
        /// The endpoint being connected to.
        endpoint: Endpoint,
        /// The configured connect timeout.
        timeout: Duration,
    },

    /// A wire request exceeded the request timeout.
    #[error("request to {endpoint} timed out after {timeout:?}")]
    RequestTimeout {
        /// The endpoint serving the request.
        endpoint: Endpoint,
        /// The configured request timeout.
        timeout: Duration,
    },

    /// Admission refused: the endpoint's connection limit and waiter queue
    /// are both exhausted.
    #[error("{endpoint} saturated: {in_flight} in flight, {waiting} waiting")]
    Overloaded {
        /// The saturated endpoint.
        endpoint: Endpoint,
        /// In-flight requests at rejection time.
        in_flight: usize,
        /// Queued waiters at rejection time.
        waiting: usize,
    },

    /// The transport reported a connection-level failure.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// The endpoint the connection targeted.
        endpoint: Endpoint,
        /// Transport-reported reason.
        reason: String,
    },

    /// A payload could not be (de)serialized. Never retried; the data is
    /// presumed corrupt or schema-mismatched.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// All allowed attempts failed within the end-to-end budget.
    #[error("gave up after {attempts} attempts in {elapsed:?}: {last}")]
    ExhaustedRetries {
        /// Total attempts made, first try included.
        attempts: u32,
        /// Wall time spent across all attempts.
        elapsed: Duration,
        /// The final transient failure.
        last: Box<ClientError>,
    },
}

impl ClientError {
    /// Whether the retry loop may try again after this error.
    ///
    /// Timeouts, connection failures and admission rejections are
    /// transient. Codec failures and exhausted budgets are terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectTimeout { .. }
                | ClientError::RequestTimeout { .. }
                | ClientError::Overloaded { .. }
                | ClientError::Connection { .. }
        )
    }
}
