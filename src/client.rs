use crate::error::{Error, Result};
use crate::lookup::DEFAULT_LOOKUP_BATCH;
use crate::pacing::PacingState;
use crate::quota::QuotaRegistry;

use reqwest::header::{self, HeaderMap, HeaderValue};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use url::Url;

/// Which kind of authenticated context the session runs under.
///
/// The credential provider is external to this crate; the client only needs to know which
/// mode is active, because every operation class carries a different quota per mode. Fixed
/// for the client's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMode {
    /// A user-context session (per-user quotas).
    User,
    /// An application-context session (per-app quotas).
    App,
}

/// The subject of an associate or timeline listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    /// Refer to an account by its numeric id.
    Id(u64),
    /// Refer to an account by its handle.
    ScreenName(String),
}

impl UserRef {
    pub(crate) fn split(&self) -> (Option<u64>, Option<&str>) {
        match self {
            UserRef::Id(id) => (Some(*id), None),
            UserRef::ScreenName(name) => (None, Some(name)),
        }
    }
}

impl From<u64> for UserRef {
    fn from(id: u64) -> UserRef {
        UserRef::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> UserRef {
        UserRef::ScreenName(name.to_string())
    }
}

impl From<String> for UserRef {
    fn from(name: String) -> UserRef {
        UserRef::ScreenName(name)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    errors: Vec<ApiErrorEntry>,
}

/// Client struct.
#[derive(Debug)]
pub struct Client {
    client: reqwest::Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
    pacing: PacingState,
    pub(crate) lookup_batch: usize,
}

impl Client {
    /// Create a new client for the API rooted at `base_url`, with the specified value for
    /// the User-Agent header and the given auth mode. The API requires a non-empty
    /// User-Agent header for all requests, preferably including the name of your project.
    pub fn new(base_url: &str, user_agent: impl AsRef<[u8]>, mode: AuthMode) -> Result<Self> {
        if user_agent.as_ref() == b"" {
            return Err(Error::CannotCreateClient(String::from(
                "User Agent mustn't be empty",
            )));
        }

        let base_url = Url::parse(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(user_agent.as_ref())?,
        );

        match reqwest::Client::builder().default_headers(headers).build() {
            Ok(c) => Ok(Client {
                client: c,
                base_url,
                authorization: None,
                pacing: PacingState::new(mode, QuotaRegistry::default()),
                lookup_batch: DEFAULT_LOOKUP_BATCH,
            }),
            Err(e) => Err(Error::CannotCreateClient(format!("{:?}", e))),
        }
    }

    /// Attach a preformed `Authorization` header value to every request, as supplied by
    /// whatever credential provider the caller uses.
    pub fn with_authorization(mut self, value: &str) -> Result<Self> {
        self.authorization = Some(HeaderValue::from_str(value)?);
        Ok(self)
    }

    /// Replace the built-in quota table, e.g. with values fetched from the platform's
    /// rate-limit-status endpoint. Resets the pacing state.
    pub fn with_quota_registry(mut self, registry: QuotaRegistry) -> Self {
        self.pacing = PacingState::new(self.pacing.mode(), registry);
        self
    }

    /// Override how many ids a single bulk-lookup request may carry. The default matches
    /// the platform's documented constraint, but that constraint is policy, not protocol.
    pub fn lookup_batch_size(mut self, batch: usize) -> Self {
        self.lookup_batch = batch.max(1);
        self
    }

    /// The auth mode this client was constructed with.
    pub fn auth_mode(&self) -> AuthMode {
        self.pacing.mode()
    }

    /// The pacing state governing this client's pull-path requests.
    pub fn pacing(&self) -> &PacingState {
        &self.pacing
    }

    pub(crate) async fn get_endpoint_query<Q>(
        &self,
        endpoint: &str,
        query: &Q,
    ) -> Result<reqwest::Response>
    where
        Q: Serialize + ?Sized,
    {
        let url = format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint
        );

        let mut request = self.client.get(&url).query(query);

        if let Some(auth) = &self.authorization {
            request = request.header(header::AUTHORIZATION, auth.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::CannotSendRequest(format!("{:?}", e)))?;

        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            // The API reports failures as a JSON list of messages; fall back to the status
            // code alone when the body is something else.
            let reason = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.errors.into_iter().next())
                .map(|entry| entry.message);

            Err(Error::Http {
                code: status.as_u16(),
                reason,
            })
        }
    }

    pub(crate) async fn get_json_endpoint_query<Q, T>(&self, endpoint: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.get_endpoint_query(endpoint, query)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::Serial(format!("{:?}", e)))
    }
}
