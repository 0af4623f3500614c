//! Client for the Uniswap V4 positions subgraph and the enrichment pipeline
//! that joins position records with their on-chain state.

/// The gateway deployment of the Uniswap V4 positions subgraph on Base.
/// Gateway endpoints require a bearer token.
pub const DEFAULT_SUBGRAPH_URL: &str =
    "https://gateway.thegraph.com/api/subgraphs/id/HNCFA9TyBqpo5qpe6QreQABAA1kV8g46mhkCcicu6v2R";

use {
    crate::{
        domain::{
            eth::{H160, H256, U256, lowercase_address},
            position::{self, PoolKey, PositionInfo},
        },
        infra::subgraph::{SubgraphClient, json_map},
    },
    anyhow::{Context, Result},
    reqwest::{Client, Url},
    serde::Deserialize,
};

/// Uniswap V4 subgraph client for fetching position records.
pub struct UniswapSubgraphClient {
    client: SubgraphClient,
}

impl UniswapSubgraphClient {
    pub fn from_subgraph_url(
        subgraph_url: &Url,
        client: Client,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            client: SubgraphClient::new(subgraph_url.clone(), client, auth_token),
        }
    }

    /// Retrieves the owner's position records. An owner without positions
    /// yields an empty list.
    pub async fn positions(&self, owner: H160) -> Result<Vec<Position>> {
        use self::positions_query::*;

        Ok(self
            .client
            .query::<Data>(
                QUERY,
                Some(json_map! {
                    "owner" => lowercase_address(&owner),
                }),
            )
            .await?
            .positions)
    }
}

/// A raw position record as indexed by the subgraph.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    /// The position manager NFT id as a base-10 decimal string.
    pub token_id: String,
}

/// A pool's current price snapshot.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Slot0 {
    pub sqrt_price: U256,
    pub tick: i32,
    pub protocol_fee: u32,
    pub lp_fee: u32,
}

/// On-chain reads the enrichment pipeline needs, normally served by a
/// multicall against the position manager and state-view contracts.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PositionReader: Send + Sync {
    async fn position_liquidity(&self, token_id: U256) -> Result<U256>;

    /// Returns the position's pool key together with the packed position
    /// info word.
    async fn pool_and_position_info(&self, token_id: U256) -> Result<(PoolKey, U256)>;

    async fn slot0(&self, pool_id: H256) -> Result<Slot0>;
}

/// A position record joined with its decoded on-chain state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnrichedPosition {
    pub token_id: U256,
    pub liquidity: U256,
    pub pool_key: PoolKey,
    pub info: PositionInfo,
    pub pool_id: H256,
    pub slot0: Slot0,
}

/// Joins subgraph position records with their on-chain state. Records whose
/// reads fail or whose liquidity is zero are dropped, matching the dashboard
/// behaviour of hiding stale entries.
pub async fn enrich_positions(
    reader: &dyn PositionReader,
    positions: &[Position],
) -> Vec<EnrichedPosition> {
    let mut enriched = Vec::with_capacity(positions.len());
    for position in positions {
        match enrich_position(reader, position).await {
            Ok(Some(position)) => enriched.push(position),
            Ok(None) => (),
            Err(err) => {
                tracing::warn!(id = %position.id, ?err, "skipping position");
            }
        }
    }
    enriched
}

async fn enrich_position(
    reader: &dyn PositionReader,
    position: &Position,
) -> Result<Option<EnrichedPosition>> {
    let token_id = U256::from_dec_str(&position.token_id).context("malformed token id")?;

    let liquidity = reader.position_liquidity(token_id).await?;
    if liquidity.is_zero() {
        return Ok(None);
    }

    let (pool_key, raw_info) = reader.pool_and_position_info(token_id).await?;
    let info = position::decode_position_info(raw_info);
    let pool_id = position::pool_id_from_key(&pool_key);
    let slot0 = reader.slot0(pool_id).await?;

    Ok(Some(EnrichedPosition {
        token_id,
        liquidity,
        pool_key,
        info,
        pool_id,
        slot0,
    }))
}

mod positions_query {
    use serde::Deserialize;

    pub const QUERY: &str = r#"
        query GetPositions($owner: String!) {
            positions(where: { owner: $owner }) {
                id
                tokenId
            }
        }
    "#;

    #[derive(Debug, Deserialize)]
    pub struct Data {
        pub positions: Vec<super::Position>,
    }
}
