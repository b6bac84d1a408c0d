//! Sample aggregate data for the `tally-chat` binary.

use serde_json::json;
use tally_core::Role;
use tally_metrics::{AggregateKind, InMemoryMetricsProvider};

/// Provider serving a small chain: HQ, state `CA` and store `1042`.
pub fn demo_provider() -> InMemoryMetricsProvider {
    let ca = Role::State("CA".to_string());
    let store = Role::Store("1042".to_string());

    InMemoryMetricsProvider::new()
        .with_records(
            Role::Hq,
            AggregateKind::Summary,
            vec![json!({"total_revenue": 50211527.85, "total_orders": 2046713, "state_count": 12})],
        )
        .with_records(
            Role::Hq,
            AggregateKind::Trend,
            vec![json!({"current_revenue": 50211527.85, "previous_revenue": 48185727.31})],
        )
        .with_records(
            Role::Hq,
            AggregateKind::StateRanking,
            vec![
                json!({"state": "CA", "revenue": 9120344.10}),
                json!({"state": "TX", "revenue": 7880121.44}),
                json!({"state": "NV", "revenue": "$1,204,880.00"}),
            ],
        )
        .with_records(
            ca.clone(),
            AggregateKind::Summary,
            vec![json!({"sales": "$9,120,344.10", "orders": 371204, "store_count": 58})],
        )
        .with_records(ca.clone(), AggregateKind::Trend, vec![json!({"pct_change": -2.4})])
        .with_records(
            ca,
            AggregateKind::StoreRanking,
            vec![
                json!({"store_id": 1042, "revenue": 402118.75}),
                json!({"store_id": 1107, "revenue": 288410.00}),
                json!({"store_id": 2210, "revenue": 91022.30}),
            ],
        )
        .with_records(
            store.clone(),
            AggregateKind::Summary,
            vec![json!({"total_revenue": 402118.75, "total_orders": 31877, "aov": 12.61})],
        )
        .with_records(store.clone(), AggregateKind::Trend, vec![json!({"revenue_trend": 1.8})])
        .with_records(
            store,
            AggregateKind::ProductMix,
            vec![
                json!({"product": "Latte", "units": 1204}),
                json!({"product": "Cold Brew", "units": 988}),
                json!({"product": "Croissant", "units_sold": "640"}),
            ],
        )
}
