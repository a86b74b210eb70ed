use std::sync::Arc;

use aceload_application::{
    AceRepository, EntityRepository, IterationDriver, IterationOutcome, LogScope, RetryPolicy,
    TeardownRepository, TeardownService, WorkloadService,
};
use aceload_core::{AppError, BusinessKey};
use aceload_domain::{
    AceGrant, Action, EntityKind, NewGroup, NewResource, NewUser, Principal, RecordCount,
    ResourceOrigin,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use super::{AceUpsertStrategy, PostgresAccessControlStore};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres access control tests: {error}");
    }

    Some(pool)
}

fn driver(store: &Arc<PostgresAccessControlStore>) -> IterationDriver {
    IterationDriver::new(
        WorkloadService::new(store.clone(), store.clone()),
        TeardownService::new(store.clone()),
    )
}

// The generated tables are global, so every scenario runs in one test to
// keep teardown from racing other tests.
#[tokio::test]
async fn store_round_trips_both_upsert_strategies() {
    let Some(pool) = test_pool().await else {
        return;
    };

    for strategy in [AceUpsertStrategy::ReadModifyWrite, AceUpsertStrategy::Native] {
        let store = Arc::new(PostgresAccessControlStore::new(
            pool.clone(),
            RetryPolicy::default(),
            strategy,
        ));
        let driver = driver(&store);
        assert!(driver.clean_start(LogScope::root()).await.is_ok());

        assert!(store.add_user(&NewUser::placeholder(0)).await.is_ok());
        assert!(store.add_group(&NewGroup::placeholder(0)).await.is_ok());
        let resource = NewResource::placeholder(ResourceOrigin::User, 0);
        assert!(store.add_resource(&resource).await.is_ok());

        let duplicate = store.add_user(&NewUser::placeholder(0)).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        let missing = store
            .add_membership(&BusinessKey::from_ordinal(9), &BusinessKey::from_ordinal(0))
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let user = Principal::User(BusinessKey::from_ordinal(0));
        let created = store
            .grant_action(&AceGrant::new(user.clone(), resource.key.clone(), Action::Create))
            .await;
        assert!(created.is_ok());
        let merged = store
            .grant_action(&AceGrant::new(user, resource.key.clone(), Action::Read))
            .await
            .unwrap_or_default();
        assert_eq!(merged.actions(), &[Action::Create, Action::Read]);

        let counts = store.count_rows().await.unwrap_or_default();
        assert_eq!(counts.aces, 1, "strategy {strategy}");

        assert!(
            store
                .remove_entity(EntityKind::User, &BusinessKey::from_ordinal(0))
                .await
                .is_ok()
        );
        let counts = store.count_rows().await.unwrap_or_default();
        assert_eq!(counts.users, 0);
        assert_eq!(counts.aces, 0);

        assert!(driver.clean_start(LogScope::root()).await.is_ok());
        let outcome = driver
            .run_with_counts(LogScope::root(), RecordCount::new(2, 1, 1, 1, 1))
            .await;
        assert!(matches!(outcome, Ok(IterationOutcome::Completed { .. })));
        assert!(store.count_rows().await.unwrap_or_default().is_empty());

        insert_rows_without_valid_keys(&pool).await;
        assert_eq!(store.count_rows().await.unwrap_or_default().memberships, 1);
        assert!(driver.clean_start(LogScope::root()).await.is_ok());
        assert!(store.count_rows().await.unwrap_or_default().is_empty());
    }
}

async fn insert_rows_without_valid_keys(pool: &PgPool) {
    let user = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO users (uid, passwordhash, utype)
            VALUES ('  ', 'hash', 'regular')
            RETURNING id
            "#,
    )
    .fetch_one(pool)
    .await;
    let group = sqlx::query_scalar::<_, i64>(
        r#"
            INSERT INTO groups (gid)
            VALUES ('')
            RETURNING id
            "#,
    )
    .fetch_one(pool)
    .await;
    let (Ok(user), Ok(group)) = (user, group) else {
        panic!("failed to insert rows without valid keys");
    };

    let membership = sqlx::query("INSERT INTO user_groups (user_id, group_id) VALUES ($1, $2)")
        .bind(user)
        .bind(group)
        .execute(pool)
        .await;
    assert!(membership.is_ok());
}

#[test]
fn upsert_strategy_parses_configuration_names() {
    assert_eq!(
        "read-modify-write".parse::<AceUpsertStrategy>().ok(),
        Some(AceUpsertStrategy::ReadModifyWrite)
    );
    assert_eq!(
        "native".parse::<AceUpsertStrategy>().ok(),
        Some(AceUpsertStrategy::Native)
    );
    assert!(matches!(
        "merge".parse::<AceUpsertStrategy>(),
        Err(AppError::Validation(_))
    ));
    assert_eq!(AceUpsertStrategy::default().to_string(), "read-modify-write");
}
