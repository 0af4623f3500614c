//! Thin GraphQL-over-HTTP client shared by the protocol subgraph clients.

use {
    anyhow::{Context, Result, anyhow, bail},
    reqwest::{Client, Url},
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::{Map, Value},
    std::time::Duration,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the JSON variables object for a GraphQL query.
macro_rules! json_map {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = serde_json::Map::new();
        $(
            map.insert(($key).into(), serde_json::json!($value));
        )*
        map
    }};
}
pub(crate) use json_map;

/// A client for GraphQL subgraph endpoints, optionally authenticating with a
/// bearer token for gateway-hosted deployments.
pub struct SubgraphClient {
    client: Client,
    url: Url,
    auth_token: Option<String>,
    timeout: Duration,
}

impl SubgraphClient {
    pub fn new(url: Url, client: Client, auth_token: Option<String>) -> Self {
        Self {
            client,
            url,
            auth_token,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Performs a query, deserializing the `data` payload into `T`.
    /// GraphQL-level errors are mapped to `Err` just like transport errors.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Map<String, Value>>,
    ) -> Result<T> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or_default(),
        });

        let mut request = self
            .client
            .post(self.url.clone())
            .json(&body)
            .timeout(self.timeout);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("subgraph request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("subgraph returned HTTP {status}");
        }

        match response
            .json::<QueryResponse<T>>()
            .await
            .context("failed to decode subgraph response")?
        {
            QueryResponse {
                data: Some(data), ..
            } => Ok(data),
            QueryResponse {
                errors: Some(errors),
                ..
            } if !errors.is_empty() => {
                tracing::debug!(?errors, "subgraph query returned errors");
                Err(anyhow!("subgraph query failed: {}", errors[0].message))
            }
            _ => Err(anyhow!("empty subgraph response")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    data: Option<T>,
    errors: Option<Vec<QueryError>>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    message: String,
}
