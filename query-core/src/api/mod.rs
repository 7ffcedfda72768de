//! # Blockset Query Surface
//!
//! Concrete requests for the blockchain data service, built on the
//! orchestrator. Entity types stay generic; callers pick what each resource
//! decodes into.

mod hal;

pub use hal::{decode, decode_page};

use crate::chunk::Chunk;
use crate::completion::{completion_channel, QueryHandle};
use crate::config::OrchestratorConfig;
use crate::error::{QueryError, TransportError};
use crate::metrics::QueryMetrics;
use crate::orchestrator::{BulkQuery, RequestOrchestrator};
use crate::paging::{Page, PageCursor};
use crate::traits::{PageFetch, TaskExecutor, Transport};
use crate::utils::CancellableTransport;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::marker::PhantomData;
use std::sync::Arc;

const UNPROCESSABLE_ENTITY: u16 = 422;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A transport-agnostic request description.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Resource path, or an absolute URL when following a page cursor.
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            params: Vec::new(),
            body: Some(body),
        }
    }

    /// Request for the page behind `cursor`; the cursor already carries the
    /// original query parameters.
    pub fn follow(cursor: &PageCursor) -> Self {
        Self::get(cursor.as_str())
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn param_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Maps a transport failure to a query error, recognising the remote's
/// "unprocessable submission" status.
pub fn submission_error(error: TransportError) -> QueryError {
    match error {
        TransportError::Http {
            status_code: UNPROCESSABLE_ENTITY,
            endpoint,
        } => QueryError::Submission {
            reason: format!("{} rejected the submission", endpoint),
        },
        other => QueryError::Transport(other),
    }
}

/// Fetches pages of one resource, adding one `address` parameter per chunk
/// key on the first page.
pub struct ResourcePageFetch<Tr, T> {
    transport: Arc<Tr>,
    resource: String,
    params: Vec<(String, String)>,
    _item: PhantomData<fn() -> T>,
}

impl<Tr, T> ResourcePageFetch<Tr, T> {
    pub fn new(transport: Arc<Tr>, resource: &str, params: Vec<(String, String)>) -> Self {
        Self {
            transport,
            resource: resource.to_string(),
            params,
            _item: PhantomData,
        }
    }

    fn first_page_request(&self, chunk: &Chunk<String>) -> ApiRequest {
        let mut request = ApiRequest::get(self.resource.as_str());
        request.params.extend(self.params.iter().cloned());
        chunk
            .keys()
            .iter()
            .fold(request, |request, address| request.param("address", address))
    }
}

#[async_trait]
impl<Tr, T> PageFetch<String, T> for ResourcePageFetch<Tr, T>
where
    Tr: Transport + 'static,
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch(
        &self,
        chunk: &Chunk<String>,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<T>, QueryError> {
        let request = match cursor {
            Some(cursor) => ApiRequest::follow(cursor),
            None => self.first_page_request(chunk),
        };
        let body = self.transport.send(request).await?;
        decode_page(&body, &self.resource)
    }
}

/// Entities carrying a remote processing status.
pub trait HasStatus {
    fn status(&self) -> &str;
}

/// Optional statuses the remote service advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub transfer_status_revert: bool,
    pub transfer_status_reject: bool,
}

impl Capabilities {
    pub fn accepts_status(&self, status: &str) -> bool {
        match status {
            "confirmed" | "submitted" | "failed" => true,
            "reverted" => self.transfer_status_revert,
            "rejected" => self.transfer_status_reject,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionQueryOptions {
    pub begin_height: Option<u64>,
    pub end_height: Option<u64>,
    pub include_raw: bool,
    pub include_proof: bool,
    pub include_transfers: bool,
    pub is_sweep: bool,
    pub max_page_size: Option<usize>,
}

/// Client for the blockchain data service's chunked, paged and
/// eventually-consistent queries.
pub struct BlocksetQueries<Tr> {
    transport: Arc<CancellableTransport<Tr>>,
    orchestrator: RequestOrchestrator,
    config: OrchestratorConfig,
    capabilities: Capabilities,
}

impl<Tr: Transport + 'static> BlocksetQueries<Tr> {
    pub fn new(
        transport: Tr,
        executor: Arc<dyn TaskExecutor>,
        config: OrchestratorConfig,
    ) -> Self {
        let orchestrator = RequestOrchestrator::new(executor)
            .with_max_pages_per_chunk(config.max_pages_per_chunk);
        Self {
            transport: Arc::new(CancellableTransport::new(transport)),
            orchestrator,
            config,
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn metrics(&self) -> &Arc<QueryMetrics> {
        self.orchestrator.metrics()
    }

    /// Cancels every outstanding request issued through this client. Queries
    /// waiting on them fail with [`TransportError::Cancelled`].
    pub fn cancel_all(&self) {
        self.transport.cancel_all();
    }

    /// Transfers touching any of `addresses`.
    ///
    /// Fails synchronously if `addresses` is empty.
    pub fn get_transfers<T>(
        &self,
        blockchain_id: &str,
        addresses: Vec<String>,
        begin_height: Option<u64>,
        end_height: Option<u64>,
        max_page_size: Option<usize>,
    ) -> Result<QueryHandle<Vec<T>>, QueryError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let params = ApiRequest::get("transfers")
            .param("blockchain_id", blockchain_id)
            .param_opt("start_height", begin_height)
            .param_opt("end_height", end_height)
            .param("merge_currencies", true)
            .param(
                "max_page_size",
                max_page_size.unwrap_or(self.config.max_page_size),
            )
            .params;

        let fetch = ResourcePageFetch::new(self.transport.clone(), "transfers", params);
        let (completion, handle) = completion_channel();
        self.orchestrator.submit_bulk(
            BulkQuery::new("transfers", addresses, self.config.chunk_size, fetch),
            completion,
        )?;
        Ok(handle)
    }

    /// Transactions touching any of `addresses`. Every returned transaction
    /// must carry a status this client accepts.
    ///
    /// Fails synchronously if `addresses` is empty.
    pub fn get_transactions<T>(
        &self,
        blockchain_id: &str,
        addresses: Vec<String>,
        options: TransactionQueryOptions,
    ) -> Result<QueryHandle<Vec<T>>, QueryError>
    where
        T: DeserializeOwned + HasStatus + Send + 'static,
    {
        let page_multiplier = if options.include_transfers { 1 } else { 3 };
        let max_page_size = options
            .max_page_size
            .unwrap_or(page_multiplier * self.config.max_page_size);

        let params = ApiRequest::get("transactions")
            .param("blockchain_id", blockchain_id)
            .param("include_proof", options.include_proof)
            .param("include_raw", options.include_raw)
            .param("include_transfers", options.include_transfers)
            .param("is_sweep", options.is_sweep)
            .param("include_calls", false)
            .param("merge_currencies", true)
            .param_opt("start_height", options.begin_height)
            .param_opt("end_height", options.end_height)
            .param("max_page_size", max_page_size)
            .params;

        let capabilities = self.capabilities;
        let fetch = ResourcePageFetch::new(self.transport.clone(), "transactions", params);
        let query = BulkQuery::new("transactions", addresses, self.config.chunk_size, fetch)
            .with_validator(move |transactions: &[T]| {
                if transactions
                    .iter()
                    .all(|t| capabilities.accepts_status(t.status()))
                {
                    Ok(())
                } else {
                    Err(QueryError::protocol("Invalid Transactions"))
                }
            });

        let (completion, handle) = completion_channel();
        self.orchestrator.submit_bulk(query, completion)?;
        Ok(handle)
    }

    /// Verified currencies, optionally narrowed to one blockchain or network.
    pub fn get_currencies<T>(
        &self,
        blockchain_id: Option<&str>,
        is_mainnet: Option<bool>,
    ) -> QueryHandle<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let params = ApiRequest::get("currencies")
            .param_opt("blockchain_id", blockchain_id)
            .param_opt("testnet", is_mainnet.map(|mainnet| !mainnet))
            .param("verified", true)
            .params;

        let fetch = ResourcePageFetch::new(self.transport.clone(), "currencies", params);
        let (completion, handle) = completion_channel();
        self.orchestrator.submit_paged("currencies", fetch, completion);
        handle
    }

    /// Creates an account for `public_key` and resolves once the service
    /// lists it. An account that already exists is looked up directly.
    pub fn create_account<T>(&self, blockchain_id: &str, public_key: &str) -> QueryHandle<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let create = {
            let transport = self.transport.clone();
            let request = ApiRequest::post(
                "accounts",
                json!({ "blockchain_id": blockchain_id, "pub_key": public_key }),
            );
            async move { transport.send(request).await.map_err(submission_error) }
        };

        let probe = {
            let transport = self.transport.clone();
            let request = ApiRequest::get("accounts")
                .param("blockchain_id", blockchain_id)
                .param("pub_key", public_key);
            move || {
                let transport = transport.clone();
                let request = request.clone();
                async move {
                    let body = transport.send(request).await?;
                    let accounts: Page<T> = decode_page(&body, "accounts")?;
                    Ok::<_, QueryError>((!accounts.items.is_empty()).then_some(accounts.items))
                }
            }
        };

        let (completion, handle) = completion_channel();
        self.orchestrator.submit_create_and_await(
            "accounts",
            create,
            probe,
            self.config.retry.policy(),
            self.config.retry.initial_delay(),
            completion,
        );
        handle
    }
}
