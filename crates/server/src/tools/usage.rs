//! Usage statistics tools.

use aide_core::{UsageStats, UsageTracker};
use chrono::Utc;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the usage_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UsageStatsOutput {
    pub stats: UsageStats,
    /// Human-readable rendering of the statistics.
    pub panel: String,
}

/// Parameters for the usage_reset tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UsageResetParams {
    /// Must be true to discard the usage records.
    #[serde(default)]
    pub confirm: bool,
}

/// Output from the usage_reset tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UsageResetOutput {
    pub reset: bool,
}

/// Implementation of the usage_stats tool.
pub async fn stats_impl(usage: &UsageTracker) -> Result<CallToolResult, McpError> {
    let stats = usage.stats(Utc::now());
    let panel = stats.to_string();
    json_result(&UsageStatsOutput { stats, panel })
}

/// Implementation of the usage_reset tool.
pub async fn reset_impl(usage: &UsageTracker, params: UsageResetParams) -> Result<CallToolResult, McpError> {
    let reset = usage.reset(|| params.confirm)?;
    json_result(&UsageResetOutput { reset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::output_json;
    use aide_core::{SharedStore, SqliteStore};
    use std::sync::Arc;

    fn tracker() -> UsageTracker {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory(64 * 1024).unwrap());
        UsageTracker::new(store)
    }

    #[tokio::test]
    async fn test_stats_after_visits() {
        let usage = tracker();
        usage.track_visit(Utc::now());
        usage.track_visit(Utc::now());

        let output = output_json(&stats_impl(&usage).await.unwrap());
        assert_eq!(output["stats"]["uniqueUsers"], 1);
        assert_eq!(output["stats"]["totalVisits"], 2);
        assert_eq!(output["stats"]["averageVisitsPerUser"], 2.0);
        assert_eq!(output["stats"]["activeUsersLast30Days"], 1);
        assert!(output["panel"].as_str().unwrap().contains("Total Visits: 2"));
    }

    #[tokio::test]
    async fn test_reset_requires_confirmation() {
        let usage = tracker();
        usage.track_visit(Utc::now());

        let output = output_json(&reset_impl(&usage, UsageResetParams { confirm: false }).await.unwrap());
        assert_eq!(output["reset"], false);
        assert_eq!(usage.stats(Utc::now()).total_visits, 1);

        let output = output_json(&reset_impl(&usage, UsageResetParams { confirm: true }).await.unwrap());
        assert_eq!(output["reset"], true);
        assert_eq!(usage.stats(Utc::now()).total_visits, 0);
    }
}
