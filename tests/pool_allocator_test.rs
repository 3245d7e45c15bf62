use chrono::{DateTime, TimeZone, Utc};
use compliance_ledger::domain::model::{
    Pool, PoolCreateInput, PoolStatus, PoolType, PoolUpdateInput,
};
use compliance_ledger::{LedgerError, MemoryStore, PoolAllocator};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn create_input(name: &str) -> PoolCreateInput {
    PoolCreateInput {
        name: name.to_string(),
        description: Some("North Sea operators".to_string()),
        pool_type: PoolType::Voluntary,
        start_date: date(2025, 1, 1),
        end_date: date(2025, 12, 31),
    }
}

async fn pool_with_total(allocator: &PoolAllocator, total: f64) -> Pool {
    let pool = assert_ok!(allocator.create_pool(create_input("Fleet pool")).await);
    assert_ok!(
        allocator
            .update_pool(
                &pool.id,
                PoolUpdateInput {
                    total_compliance_units: Some(total),
                    ..Default::default()
                },
            )
            .await
    )
}

fn allocator() -> PoolAllocator {
    PoolAllocator::new(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_create_pool_defaults() {
    let allocator = allocator();
    let pool = assert_ok!(allocator.create_pool(create_input("  Fleet pool  ")).await);

    assert_eq!(pool.name, "Fleet pool");
    assert_eq!(pool.status, PoolStatus::Pending);
    assert_eq!(pool.total_compliance_units, 0.0);
    assert_eq!(pool.allocated_compliance_units, 0.0);
    assert!(!pool.id.is_empty());

    let fetched = assert_ok!(allocator.get_pool(&pool.id).await);
    assert_eq!(fetched, pool);
}

#[tokio::test]
async fn test_create_pool_rejects_bad_input() {
    let allocator = allocator();

    let err = assert_err!(allocator.create_pool(create_input("   ")).await);
    assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "name"));

    let mut reversed = create_input("Fleet pool");
    reversed.end_date = reversed.start_date;
    let err = assert_err!(allocator.create_pool(reversed).await);
    assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "start_date"));

    assert!(assert_ok!(allocator.list_pools(None).await).is_empty());
}

#[tokio::test]
async fn test_conservation_and_atomic_removal() {
    let allocator = allocator();
    let pool = pool_with_total(&allocator, 100.0).await;

    assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 30.0).await);
    assert_ok!(allocator.add_member(&pool.id, "SHIP-B", 20.0).await);
    let pool_now = assert_ok!(allocator.get_pool(&pool.id).await);
    assert_eq!(pool_now.allocated_compliance_units, 50.0);

    // 50 + 60 would exceed the 100 total, for an existing member and a newcomer alike
    let err = assert_err!(allocator.allocate_units(&pool.id, "SHIP-A", 60.0).await);
    assert!(matches!(err, LedgerError::ConservationViolation { .. }));
    let members = assert_ok!(allocator.get_members(&pool.id).await);
    let ship_a = members.iter().find(|m| m.ship_id == "SHIP-A").unwrap();
    assert_eq!(ship_a.allocated_units, 30.0);

    let err = assert_err!(allocator.allocate_units(&pool.id, "SHIP-C", 60.0).await);
    assert!(matches!(err, LedgerError::ConservationViolation { .. }));
    let pool_now = assert_ok!(allocator.get_pool(&pool.id).await);
    assert_eq!(pool_now.allocated_compliance_units, 50.0);
    assert_eq!(assert_ok!(allocator.get_members(&pool.id).await).len(), 2);

    let removed = assert_ok!(allocator.remove_member(&pool.id, "SHIP-A").await);
    assert_eq!(removed.map(|m| m.allocated_units), Some(30.0));

    let pool_now = assert_ok!(allocator.get_pool(&pool.id).await);
    assert_eq!(pool_now.allocated_compliance_units, 20.0);
    let members = assert_ok!(allocator.get_members(&pool.id).await);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].ship_id, "SHIP-B");
    assert_eq!(members[0].allocated_units, 20.0);

    let audit = assert_ok!(allocator.reconcile(&pool.id).await);
    assert_eq!(audit.member_sum, 20.0);
    assert_eq!(audit.member_count, 1);
}

#[tokio::test]
async fn test_contribution_follows_total() {
    let allocator = allocator();
    let pool = pool_with_total(&allocator, 200.0).await;

    let member = assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 50.0).await);
    assert_eq!(member.contribution, 25.0);

    let member = assert_ok!(allocator.allocate_units(&pool.id, "SHIP-A", 50.0).await);
    assert_eq!(member.allocated_units, 100.0);
    assert_eq!(member.contribution, 50.0);

    assert_ok!(
        allocator
            .update_pool(
                &pool.id,
                PoolUpdateInput {
                    total_compliance_units: Some(400.0),
                    ..Default::default()
                },
            )
            .await
    );
    let members = assert_ok!(allocator.get_members(&pool.id).await);
    assert_eq!(members[0].contribution, 25.0);
}

#[tokio::test]
async fn test_zero_total_pool() {
    let allocator = allocator();
    let pool = assert_ok!(allocator.create_pool(create_input("Empty")).await);

    // nothing fits in a zero total, but a zero allocation does
    let err = assert_err!(allocator.add_member(&pool.id, "SHIP-A", 1.0).await);
    assert!(matches!(err, LedgerError::ConservationViolation { .. }));
    let member = assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 0.0).await);
    assert_eq!(member.contribution, 0.0);
}

#[tokio::test]
async fn test_total_cannot_drop_below_allocated() {
    let allocator = allocator();
    let pool = pool_with_total(&allocator, 100.0).await;
    assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 80.0).await);

    let err = assert_err!(
        allocator
            .update_pool(
                &pool.id,
                PoolUpdateInput {
                    total_compliance_units: Some(50.0),
                    ..Default::default()
                },
            )
            .await
    );
    assert!(matches!(err, LedgerError::ConservationViolation { .. }));
    assert_eq!(
        assert_ok!(allocator.get_pool(&pool.id).await).total_compliance_units,
        100.0
    );
}

#[tokio::test]
async fn test_member_rules() {
    let allocator = allocator();
    let pool = pool_with_total(&allocator, 100.0).await;

    assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 10.0).await);
    let err = assert_err!(allocator.add_member(&pool.id, "SHIP-A", 10.0).await);
    assert!(matches!(err, LedgerError::Validation { .. }));

    let err = assert_err!(allocator.allocate_units(&pool.id, "SHIP-A", -5.0).await);
    assert!(matches!(err, LedgerError::Validation { .. }));

    let err = assert_err!(allocator.add_member("missing", "SHIP-A", 10.0).await);
    assert!(matches!(err, LedgerError::NotFound { .. }));

    let removed = assert_ok!(allocator.remove_member(&pool.id, "SHIP-Z").await);
    assert!(removed.is_none());
    assert_eq!(
        assert_ok!(allocator.get_pool(&pool.id).await).allocated_compliance_units,
        10.0
    );

    let pools = assert_ok!(allocator.list_pools_for_ship("SHIP-A").await);
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].id, pool.id);
}

#[tokio::test]
async fn test_closed_pool_is_frozen() {
    let allocator = allocator();
    let pool = pool_with_total(&allocator, 100.0).await;
    assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 10.0).await);

    let closed = assert_ok!(
        allocator
            .update_pool(
                &pool.id,
                PoolUpdateInput {
                    status: Some(PoolStatus::Closed),
                    ..Default::default()
                },
            )
            .await
    );
    assert_eq!(closed.status, PoolStatus::Closed);

    assert_err!(allocator.add_member(&pool.id, "SHIP-B", 10.0).await);
    assert_err!(allocator.allocate_units(&pool.id, "SHIP-A", 10.0).await);
    assert_err!(allocator.remove_member(&pool.id, "SHIP-A").await);
    assert_err!(
        allocator
            .update_pool(
                &pool.id,
                PoolUpdateInput {
                    status: Some(PoolStatus::Active),
                    ..Default::default()
                },
            )
            .await
    );
    assert!(assert_ok!(allocator.list_active_pools().await).is_empty());
}

#[tokio::test]
async fn test_delete_pool_cascades() {
    let allocator = allocator();
    let pool = pool_with_total(&allocator, 100.0).await;
    assert_ok!(allocator.add_member(&pool.id, "SHIP-A", 10.0).await);
    assert_ok!(allocator.add_member(&pool.id, "SHIP-B", 10.0).await);

    assert_ok!(allocator.delete_pool(&pool.id).await);

    let err = assert_err!(allocator.get_pool(&pool.id).await);
    assert!(matches!(err, LedgerError::NotFound { .. }));
    assert!(assert_ok!(allocator.list_pools_for_ship("SHIP-A").await).is_empty());
    assert_err!(allocator.delete_pool(&pool.id).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocations_respect_total() {
    let allocator = Arc::new(allocator());
    let pool = pool_with_total(&allocator, 100.0).await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let allocator = allocator.clone();
        let pool_id = pool.id.clone();
        handles.push(tokio::spawn(async move {
            allocator
                .allocate_units(&pool_id, &format!("SHIP-{}", i % 8), 7.0)
                .await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(LedgerError::ConservationViolation { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    // floor(100 / 7)
    assert_eq!(accepted, 14);
    let pool_now = assert_ok!(allocator.get_pool(&pool.id).await);
    assert_eq!(pool_now.allocated_compliance_units, 98.0);
    assert!(pool_now.allocated_compliance_units <= pool_now.total_compliance_units);

    let audit = assert_ok!(allocator.reconcile(&pool.id).await);
    assert_eq!(audit.member_sum, 98.0);
}
