//! Process-wide cancellation for outstanding requests.

use crate::api::ApiRequest;
use crate::error::TransportError;
use crate::traits::Transport;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Wraps a [`Transport`] so every in-flight `send` can be cancelled at once.
///
/// `cancel_all` cancels the current generation of requests and starts a new
/// one; requests issued afterwards are unaffected. A cancelled request
/// resolves to [`TransportError::Cancelled`] and flows through the normal
/// failure path of whatever issued it.
pub struct CancellableTransport<T> {
    inner: T,
    generation: Mutex<CancellationToken>,
}

impl<T: Transport> CancellableTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            generation: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn current_token(&self) -> CancellationToken {
        self.generation
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn cancel_all(&self) {
        let previous = {
            let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *generation, CancellationToken::new())
        };
        info!("Cancelling all outstanding requests");
        previous.cancel();
    }
}

#[async_trait]
impl<T: Transport> Transport for CancellableTransport<T> {
    async fn send(&self, request: ApiRequest) -> Result<Vec<u8>, TransportError> {
        let token = self.current_token();
        let path = request.path.clone();
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Request to {} cancelled", path);
                Err(TransportError::Cancelled)
            }
            result = self.inner.send(request) => result,
        }
    }
}
