use chrono::{DateTime, Utc};
use holdwatch_core::{HoldError, Origin, Reading, Result};
use serde::Deserialize;
use serde_json::Value;

/// JSON shape returned by the primary backend's `/api/holders`.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldersPayload {
    #[serde(default)]
    pub success:   bool,
    #[serde(default)]
    pub holders:   Option<f64>,
    /// ISO-8601; the call time is used when absent or unparseable.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Parse a primary payload.
///
/// `success: false`, a missing count and a count `<= 0` are all rejected so
/// the caller can fall back.
pub fn parse_primary(body: &str, now: DateTime<Utc>) -> Result<Reading> {
    let payload: HoldersPayload = serde_json::from_str(body)
        .map_err(|e| HoldError::Payload(format!("primary: {e}")))?;

    if !payload.success {
        return Err(HoldError::Payload("primary: success=false".into()));
    }
    let holders = payload
        .holders
        .filter(|h| h.is_finite() && *h > 0.0)
        .ok_or_else(|| HoldError::Payload(format!("primary: holders={:?}", payload.holders)))?;

    let timestamp = payload
        .timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(now);

    Ok(Reading {
        holders,
        timestamp,
        origin: Origin::Primary,
    })
}

/// Parse a token-metadata response, reading
/// `result[0].onChainMetadata.currentSupply`.
///
/// A bare top-level array (no `result` wrapper) is accepted as well.  The
/// supply may be a JSON number or a decimal string.  The count is returned
/// as-is; rejecting non-positive values is left to the poll loop.
pub fn parse_fallback(body: &str, now: DateTime<Utc>) -> Result<Reading> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| HoldError::Payload(format!("fallback: {e}")))?;

    let supply = doc
        .pointer("/result/0/onChainMetadata/currentSupply")
        .or_else(|| doc.pointer("/0/onChainMetadata/currentSupply"))
        .ok_or_else(|| HoldError::Payload("fallback: currentSupply missing".into()))?;

    let holders = match supply {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| HoldError::Payload(format!("fallback: currentSupply={supply}")))?;

    Ok(Reading {
        holders: holders.trunc(),
        timestamp: now,
        origin: Origin::Fallback,
    })
}
