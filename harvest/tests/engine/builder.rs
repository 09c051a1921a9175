use std::sync::Arc;

use harvest::{BudgetGovernor, GovernorConfig, HarvestConfig, HarvestError, Harvester};
use harvest_mock::MemoryStore;

use crate::helpers::*;

#[tokio::test]
async fn missing_collaborators_are_rejected() {
    let (source, _script) = ScriptedSource::new_with_controller("scripted");
    let err = Harvester::builder().with_source(source).build().err().unwrap();
    assert!(matches!(err, HarvestError::InvalidArg(_)));

    let err = Harvester::builder()
        .with_store(Arc::new(MemoryStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, HarvestError::InvalidArg(_)));
}

#[tokio::test]
async fn zero_limits_are_rejected() {
    let cases: [fn(harvest::HarvesterBuilder) -> harvest::HarvesterBuilder; 4] = [
        |b| b.page_limits(0, 10),
        |b| b.max_pages_per_run(0),
        |b| b.max_concurrent_symbols(0),
        |b| {
            b.governor_config(GovernorConfig {
                max_weight: 0,
                ..GovernorConfig::default()
            })
        },
    ];
    for case in cases {
        let (source, _script) = ScriptedSource::new_with_controller("scripted");
        let err = case(builder(source, Arc::new(MemoryStore::new())))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, HarvestError::InvalidArg(_)));
    }
}

#[tokio::test]
async fn engines_can_share_one_governor() {
    let governor = Arc::new(BudgetGovernor::new(GovernorConfig::default()));
    let (a, _) = ScriptedSource::new_with_controller("a");
    let (b, _) = ScriptedSource::new_with_controller("b");

    let first = builder(a, Arc::new(MemoryStore::new()))
        .with_governor(Arc::clone(&governor))
        .build()
        .unwrap();
    let second = builder(b, Arc::new(MemoryStore::new()))
        .with_governor(Arc::clone(&governor))
        .build()
        .unwrap();

    assert!(Arc::ptr_eq(first.governor(), second.governor()));
}

#[tokio::test]
async fn whole_config_can_be_supplied() {
    let cfg = HarvestConfig {
        trade_page_limit: 250,
        max_pages_per_run: Some(8),
        ..HarvestConfig::default()
    };
    let (source, _script) = ScriptedSource::new_with_controller("scripted");
    let h = Harvester::builder()
        .with_source(source)
        .with_store(Arc::new(MemoryStore::new()))
        .config(cfg)
        .build()
        .unwrap();
    assert_eq!(h.config().trade_page_limit, 250);
    assert_eq!(h.config().max_pages_per_run, Some(8));
}
