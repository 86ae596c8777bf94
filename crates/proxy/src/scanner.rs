use crate::error::ProxyError;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// SPL token account size; filters out anything that is not a token account.
const TOKEN_ACCOUNT_SIZE: u64 = 165;

/// Outcome of one scan over a mint's token accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HolderTally {
    /// Distinct owners with a positive balance.
    pub holders:  u64,
    /// Accounts returned by the RPC node.
    pub accounts: usize,
    /// Accounts that could not be parsed and were left out.
    pub skipped:  usize,
}

/// Anything that can count a mint's holders.
pub trait HolderScanner: Send + Sync {
    fn scan(&self) -> BoxFuture<'_, Result<HolderTally, ProxyError>>;
}

/// Counts holders with `getProgramAccounts` against a Solana JSON-RPC node.
#[derive(Debug, Clone)]
pub struct RpcScanner {
    client:        reqwest::Client,
    rpc_url:       String,
    token_program: String,
    mint:          String,
    retry_delay:   Duration,
}

impl RpcScanner {
    pub fn new(
        client: reqwest::Client,
        rpc_url: impl Into<String>,
        token_program: impl Into<String>,
        mint: impl Into<String>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
            token_program: token_program.into(),
            mint: mint.into(),
            retry_delay,
        }
    }

    fn request_body(&self) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getProgramAccounts",
            "params": [
                self.token_program,
                {
                    "encoding": "jsonParsed",
                    "filters": [
                        { "dataSize": TOKEN_ACCOUNT_SIZE },
                        { "memcmp": { "offset": 0, "bytes": self.mint } }
                    ]
                }
            ]
        })
    }

    async fn post(&self) -> Result<reqwest::Response, ProxyError> {
        Ok(self
            .client
            .post(&self.rpc_url)
            .json(&self.request_body())
            .send()
            .await?)
    }

    async fn scan_accounts(&self) -> Result<HolderTally, ProxyError> {
        if self.mint.trim().is_empty() {
            return Err(ProxyError::Internal("no mint configured".into()));
        }

        let mut resp = self.post().await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(
                "RPC rate limited; retrying once in {}ms",
                self.retry_delay.as_millis()
            );
            tokio::time::sleep(self.retry_delay).await;
            resp = self.post().await?;
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(ProxyError::RateLimited);
            }
        }

        let status = resp.status();
        if !status.is_success() {
            return Err(ProxyError::Upstream(format!("RPC returned {status}")));
        }

        let doc: Value = resp.json().await?;
        if let Some(err) = doc.get("error") {
            return Err(ProxyError::Upstream(format!("RPC error: {err}")));
        }
        let accounts = doc
            .get("result")
            .and_then(Value::as_array)
            .ok_or_else(|| ProxyError::Upstream("RPC response has no result array".into()))?;

        let tally = count_holders(accounts);
        info!(
            "Scanned {} token accounts: {} holders ({} skipped)",
            tally.accounts, tally.holders, tally.skipped
        );
        Ok(tally)
    }
}

impl HolderScanner for RpcScanner {
    fn scan(&self) -> BoxFuture<'_, Result<HolderTally, ProxyError>> {
        self.scan_accounts().boxed()
    }
}

/// Count distinct owners holding a positive balance.
///
/// Records missing an owner or a parseable `tokenAmount.amount` are skipped
/// and counted in [`HolderTally::skipped`]; the rest still count.
pub fn count_holders(accounts: &[Value]) -> HolderTally {
    let mut owners: HashSet<&str> = HashSet::new();
    let mut skipped = 0;

    for (i, account) in accounts.iter().enumerate() {
        let info = account.pointer("/account/data/parsed/info");
        let owner = info.and_then(|v| v.get("owner")).and_then(Value::as_str);
        let amount = info
            .and_then(|v| v.pointer("/tokenAmount/amount"))
            .and_then(parse_amount);

        match (owner, amount) {
            (Some(owner), Some(amount)) => {
                if amount > 0 {
                    owners.insert(owner);
                }
            }
            _ => {
                debug!("Skipping unparseable token account #{i}");
                skipped += 1;
            }
        }
    }

    HolderTally {
        holders: owners.len() as u64,
        accounts: accounts.len(),
        skipped,
    }
}

/// Raw amounts arrive as decimal strings; plain numbers are tolerated.
fn parse_amount(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}
