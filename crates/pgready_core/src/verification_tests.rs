//! End-to-end checks of the probe loop against a scripted connector.
//!
//! Every test here runs on a paused tokio clock, so timings are exact and
//! retry intervals cost no wall time.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ReadyError;
use crate::models::{
    parse_table_list, ConnectionTarget, ExitStatus, ProbeSettings, ProbeStatus, TimeoutPolicy,
};
use crate::services::{Prober, TableExistenceChecker};
use crate::test_support::{ConnectStep, StubCatalog, StubConnection, StubConnector};

fn target() -> ConnectionTarget {
    ConnectionTarget::new("localhost", "postgres", "postgres")
}

fn refused() -> ReadyError {
    ReadyError::connect("connection refused")
}

// =========================================================================
// Bounded termination
// =========================================================================

/// A target that never comes up stops within timeout + retry interval.
#[tokio::test(start_paused = true)]
async fn test_unreachable_target_times_out_with_bounded_overrun() {
    let connector =
        Arc::new(StubConnector::new(StubCatalog::default()).then_always(ConnectStep::Fail(refused())));
    let settings = ProbeSettings::default()
        .overall_timeout(Duration::from_millis(100))
        .attempt_timeout(Duration::from_millis(50))
        .retry_interval(Duration::from_millis(30));

    let result = Prober::new(connector.clone(), settings).run(&target(), &[]).await;

    assert_eq!(result.status(), ProbeStatus::Timeout);
    assert!(result.elapsed() >= Duration::from_millis(100));
    assert!(result.elapsed() <= Duration::from_millis(130), "{:?}", result.elapsed());
    assert_eq!(connector.connects(), 4);
    assert_eq!(result.last_error(), Some(&refused()));
}

/// A zero retry interval still terminates.
#[tokio::test(start_paused = true)]
async fn test_zero_retry_interval_with_hanging_connects_terminates() {
    let connector =
        Arc::new(StubConnector::new(StubCatalog::default()).then_always(ConnectStep::Hang));
    let settings = ProbeSettings::default()
        .overall_timeout(Duration::from_millis(90))
        .attempt_timeout(Duration::from_millis(40))
        .retry_interval(Duration::ZERO);

    let result = Prober::new(connector, settings).run(&target(), &[]).await;

    assert_eq!(result.status(), ProbeStatus::Timeout);
    assert_eq!(result.elapsed(), Duration::from_millis(90));
    assert_eq!(result.attempts(), 3);
}

// =========================================================================
// Ready paths
// =========================================================================

/// Always-succeeding connector, no tables: ready after one connect latency.
#[tokio::test(start_paused = true)]
async fn test_ready_on_first_attempt_without_tables() {
    let connector = Arc::new(
        StubConnector::new(StubCatalog::default()).with_latency(Duration::from_millis(15)),
    );

    let result =
        Prober::new(connector.clone(), ProbeSettings::default()).run(&target(), &[]).await;

    assert_eq!(result.status(), ProbeStatus::Ready);
    assert_eq!(result.attempts(), 1);
    assert_eq!(connector.connects(), 1);
    assert_eq!(result.elapsed(), Duration::from_millis(15));
    assert!(result.last_error().is_none());
    assert_eq!(result.exit_status(), ExitStatus::Ready);
}

/// Two refused connects, then success, 10ms apart.
#[tokio::test(start_paused = true)]
async fn test_ready_after_two_failed_attempts() {
    let connector =
        Arc::new(StubConnector::new(StubCatalog::default()).fail_first(2, refused()));
    let settings = ProbeSettings::default().retry_interval(Duration::from_millis(10));

    let result = Prober::new(connector.clone(), settings).run(&target(), &[]).await;

    assert_eq!(result.status(), ProbeStatus::Ready);
    assert_eq!(connector.connects(), 3);
    assert!(result.elapsed() >= Duration::from_millis(20));
    assert!(result.elapsed() <= Duration::from_millis(25), "{:?}", result.elapsed());

    let times = connector.connect_times();
    assert_eq!(times[1] - times[0], Duration::from_millis(10));
    assert_eq!(times[2] - times[1], Duration::from_millis(10));
}

/// Tables created part-way through the run are picked up.
#[tokio::test(start_paused = true)]
async fn test_ready_once_migrations_create_tables() {
    let catalog = StubCatalog::with_tables(&["public.users"]);
    let connector = Arc::new(StubConnector::new(catalog.clone()));
    let settings = ProbeSettings::default().retry_interval(Duration::from_millis(100));
    let tables = parse_table_list("users,orders").unwrap();

    let target = target();
    let prober = Prober::new(connector.clone(), settings);
    let (result, _) = tokio::join!(prober.run(&target, &tables), async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        catalog.add_table("public.orders");
    });

    assert_eq!(result.status(), ProbeStatus::Ready);
    assert_eq!(result.attempts(), 4);
    assert_eq!(catalog.opened(), 4);
    assert_eq!(catalog.released(), 4);
}

// =========================================================================
// Missing tables
// =========================================================================

/// A healthy server missing `orders` never becomes ready.
#[tokio::test(start_paused = true)]
async fn test_missing_table_times_out_and_names_table() {
    let catalog = StubCatalog::with_tables(&["public.users"]);
    let connector = Arc::new(StubConnector::new(catalog.clone()));
    let settings = ProbeSettings::default()
        .overall_timeout(Duration::from_millis(500))
        .retry_interval(Duration::from_millis(100));
    let tables = parse_table_list("users,orders").unwrap();

    let result = Prober::new(connector, settings).run(&target(), &tables).await;

    assert_eq!(result.status(), ProbeStatus::Timeout);
    let last_error = result.last_error().unwrap();
    assert!(matches!(last_error, ReadyError::MissingTables { .. }));
    assert!(last_error.to_string().contains("orders"));
    assert!(!last_error.to_string().contains("users"));
    assert_eq!(result.exit_status().code(), 1);
    assert_eq!(catalog.opened(), catalog.released());
}

/// With the classifying policy, the same run exits with the checks-failed code.
#[tokio::test(start_paused = true)]
async fn test_missing_table_with_classify_policy_reports_checks_failed() {
    let connector = Arc::new(StubConnector::new(StubCatalog::default()));
    let settings = ProbeSettings::default()
        .overall_timeout(Duration::from_millis(300))
        .retry_interval(Duration::from_millis(100))
        .timeout_policy(TimeoutPolicy::Classify);
    let tables = parse_table_list("orders").unwrap();

    let result = Prober::new(connector, settings).run(&target(), &tables).await;

    assert_eq!(result.status(), ProbeStatus::ChecksFailed);
    assert_eq!(result.exit_status().code(), 2);
}

/// Connected once, then the server went away: still a checks failure.
#[tokio::test(start_paused = true)]
async fn test_classify_policy_remembers_earlier_connection() {
    let connector = Arc::new(
        StubConnector::new(StubCatalog::default())
            .then(ConnectStep::Succeed)
            .then_always(ConnectStep::Fail(refused())),
    );
    let settings = ProbeSettings::default()
        .overall_timeout(Duration::from_millis(50))
        .retry_interval(Duration::from_millis(10))
        .timeout_policy(TimeoutPolicy::Classify);
    let tables = parse_table_list("orders").unwrap();

    let result = Prober::new(connector, settings).run(&target(), &tables).await;

    assert_eq!(result.attempts(), 5);
    assert_eq!(result.status(), ProbeStatus::ChecksFailed);
    assert_eq!(result.last_error(), Some(&refused()));
}

/// Never connected under the classifying policy: connection failure.
#[tokio::test(start_paused = true)]
async fn test_classify_policy_without_connection_reports_connection_failed() {
    let connector =
        Arc::new(StubConnector::new(StubCatalog::default()).then_always(ConnectStep::Fail(refused())));
    let settings = ProbeSettings::default()
        .overall_timeout(Duration::from_millis(50))
        .retry_interval(Duration::from_millis(10))
        .timeout_policy(TimeoutPolicy::Classify);

    let result = Prober::new(connector, settings).run(&target(), &[]).await;

    assert_eq!(result.status(), ProbeStatus::ConnectionFailed);
    assert_eq!(result.exit_status().code(), 1);
}

// =========================================================================
// Table checker
// =========================================================================

#[tokio::test]
async fn test_checker_reports_nonexistent_table() {
    let catalog = StubCatalog::with_tables(&["public.users"]);
    let mut conn = StubConnection::new(catalog);
    let tables = parse_table_list("users,nonexistent").unwrap();

    let missing = TableExistenceChecker::check(&mut conn, &tables).await.unwrap();

    assert_eq!(missing, parse_table_list("nonexistent").unwrap());
}

#[tokio::test]
async fn test_checker_with_no_tables_touches_nothing() {
    let catalog = StubCatalog::default();
    let mut conn = StubConnection::new(catalog.clone());

    let missing = TableExistenceChecker::check(&mut conn, &[]).await.unwrap();

    assert!(missing.is_empty());
    assert_eq!(catalog.lookups(), 0);
}

#[tokio::test]
async fn test_checker_distinguishes_lookup_failure_from_absence() {
    let catalog = StubCatalog::default();
    catalog.fail_lookups_with(ReadyError::catalog_query("public.users", "broken pipe"));
    let mut conn = StubConnection::new(catalog);
    let tables = parse_table_list("users").unwrap();

    let result = TableExistenceChecker::check(&mut conn, &tables).await;

    assert!(matches!(result, Err(ReadyError::CatalogQuery { .. })));
}

// =========================================================================
// Exit status
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_exit_status_is_stable_across_calls() {
    let connector = Arc::new(StubConnector::new(StubCatalog::default()));
    let result = Prober::new(connector, ProbeSettings::default()).run(&target(), &[]).await;

    let first = result.exit_status();
    let second = result.exit_status();
    assert_eq!(first, second);
    assert_eq!(ExitStatus::from_probe_status(result.status()), first);
}
