//! End-to-end admission tests: byte delta, gate, finalizers and the
//! in-memory utilization service.

use chrono::Utc;

use quotagate_core::config::QuotaConfig;
use quotagate_core::error::AppError;
use quotagate_core::traits::utilization::UtilizationServiceClient;
use quotagate_core::types::metric::{ResourceType, UtilizationMetric};
use quotagate_entity::{AccountInfo, ObjectMetadata};
use quotagate_service::{DegradedReason, QuotaDecision, RequestContext, process_bytes_to_write};

use crate::helpers::{self, TestGate};

#[tokio::test]
async fn test_successful_write_keeps_reservation() {
    let t = TestGate::new().await;
    t.backend
        .set_bytes(ResourceType::Bucket, &helpers::resource_name("photos"), 50);
    let bucket = helpers::bucket("photos", 100);
    let inflight = process_bytes_to_write("objectPut", &bucket, None, Some(40), None, None);

    let mut ctx = RequestContext::new("objectPut");
    let decision = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectPut"], "objectPut", inflight, false)
        .await
        .unwrap();
    ctx.finalize(None).await;

    assert_eq!(decision, QuotaDecision::Allowed);
    assert_eq!(t.bucket_bytes("photos"), 90);
    assert_eq!(
        t.metrics.snapshot().evaluation_count("objectPut", "bucket", 200),
        1
    );
}

#[tokio::test]
async fn test_failed_write_releases_reservation() {
    let t = TestGate::new().await;
    let bucket = helpers::bucket("photos", 100);
    let account = AccountInfo::new("acme", 1_000);

    let mut ctx = RequestContext::new("objectPut");
    t.gate
        .validate_quotas(&mut ctx, &bucket, Some(&account), &["objectPut"], "objectPut", 30, false)
        .await
        .unwrap();
    assert_eq!(t.bucket_bytes("photos"), 30);
    assert_eq!(t.account_bytes("acme"), 30);

    ctx.finalize(Some(&AppError::internal("backend write failed"))).await;

    assert_eq!(t.bucket_bytes("photos"), 0);
    assert_eq!(t.account_bytes("acme"), 0);
}

#[tokio::test]
async fn test_write_over_quota_is_denied_and_released() {
    let t = TestGate::new().await;
    t.backend
        .set_bytes(ResourceType::Bucket, &helpers::resource_name("photos"), 90);
    let bucket = helpers::bucket("photos", 100);

    let mut ctx = RequestContext::new("objectPut");
    let err = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectPut"], "objectPut", 20, false)
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());
    assert_eq!(err.status_code, Some(429));
    assert_eq!(ctx.finalizer_count(), 1);

    ctx.finalize(Some(&err)).await;
    assert_eq!(t.bucket_bytes("photos"), 90);
    assert_eq!(
        t.metrics.snapshot().evaluation_count("objectPut", "bucket", 429),
        1
    );
}

#[tokio::test]
async fn test_deletion_over_quota_is_allowed() {
    let t = TestGate::new().await;
    t.backend
        .set_bytes(ResourceType::Bucket, &helpers::resource_name("photos"), 500);
    let bucket = helpers::bucket("photos", 100);
    let existing = ObjectMetadata::with_size(200);
    let inflight = process_bytes_to_write("objectDelete", &bucket, None, None, Some(&existing), None);
    assert_eq!(inflight, -200);

    let mut ctx = RequestContext::new("objectDelete");
    let decision = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectDelete"], "objectDelete", inflight, false)
        .await
        .unwrap();
    ctx.finalize(None).await;

    assert_eq!(decision, QuotaDecision::Allowed);
    assert_eq!(t.bucket_bytes("photos"), 300);
    assert_eq!(
        t.metrics.snapshot().evaluation_count("objectDelete", "delete", 429),
        1
    );
}

#[tokio::test]
async fn test_versioned_delete_marker_needs_no_check() {
    let t = TestGate::new().await;
    let bucket = helpers::bucket("photos", 100).with_versioning(true);
    let existing = ObjectMetadata::with_size(200);
    let inflight = process_bytes_to_write("objectDelete", &bucket, None, None, Some(&existing), None);

    let mut ctx = RequestContext::new("objectDelete");
    let decision = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectDelete"], "objectDelete", inflight, false)
        .await
        .unwrap();

    assert_eq!(decision, QuotaDecision::Allowed);
    assert_eq!(t.backend.call_count(), 0);
}

#[tokio::test]
async fn test_copy_reserves_source_size_on_destination() {
    let t = TestGate::new().await;
    let bucket = helpers::bucket("archive", 1_000);
    let source = ObjectMetadata::with_size(100);
    let inflight = process_bytes_to_write("objectCopy", &bucket, None, None, Some(&source), None);

    let mut ctx = RequestContext::new("objectCopy");
    t.gate
        .validate_quotas(
            &mut ctx,
            &bucket,
            None,
            &["objectGet", "objectPut"],
            "objectCopy",
            inflight,
            false,
        )
        .await
        .unwrap();

    // Both the source read and the destination write are reported.
    assert_eq!(t.backend.call_count(), 2);
    assert_eq!(t.bucket_bytes("archive"), 200);

    ctx.finalize(Some(&AppError::internal("copy failed"))).await;
    assert_eq!(t.bucket_bytes("archive"), 0);
}

#[tokio::test]
async fn test_stale_metrics_allow_with_degradation() {
    let t = TestGate::new().await;
    t.backend.set_metric(
        ResourceType::Bucket,
        &helpers::resource_name("photos"),
        UtilizationMetric {
            bytes_total: 10_000,
            objects_total: Some(3),
            date: Some(Utc::now() - chrono::Duration::days(3)),
        },
    );
    let bucket = helpers::bucket("photos", 100);

    let mut ctx = RequestContext::new("objectPut");
    let decision = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectPut"], "objectPut", 10, false)
        .await
        .unwrap();

    assert_eq!(
        decision,
        QuotaDecision::AllowedDegraded(DegradedReason::StaleMetrics)
    );
    assert_eq!(t.metrics.snapshot().request_with_quota_metrics_unavailable, 1);
}

#[tokio::test]
async fn test_unhealthy_service_bypasses_quota() {
    let t = TestGate::new().await;
    t.backend.fail_health("connection refused");
    assert!(!t.client.check_health().await);
    let bucket = helpers::bucket("photos", 100);

    let mut ctx = RequestContext::new("objectPut");
    let decision = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectPut"], "objectPut", 10_000, false)
        .await
        .unwrap();

    assert_eq!(
        decision,
        QuotaDecision::AllowedDegraded(DegradedReason::ServiceDisabled)
    );
    assert_eq!(t.backend.call_count(), 0);
    assert!(!t.metrics.snapshot().utilization_service_available);
}

#[tokio::test]
async fn test_local_comparison_without_inflights() {
    let config = QuotaConfig {
        enable_inflights: false,
        ..QuotaConfig::default()
    };
    let t = TestGate::with_config(config).await;
    t.backend
        .set_bytes(ResourceType::Bucket, &helpers::resource_name("photos"), 90);
    let bucket = helpers::bucket("photos", 100);

    let mut ctx = RequestContext::new("objectPut");
    let err = t
        .gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectPut"], "objectPut", 20, false)
        .await
        .unwrap_err();

    assert!(err.is_quota_exceeded());
    // Nothing was reserved remotely.
    assert_eq!(t.bucket_bytes("photos"), 90);
    assert!(t.backend.calls().iter().all(|c| c.body.inflight.is_none()));
}

#[tokio::test]
async fn test_abandoned_request_releases_reservation() {
    let t = TestGate::new().await;
    let bucket = helpers::bucket("photos", 100);

    let mut ctx = RequestContext::new("objectPut");
    t.gate
        .validate_quotas(&mut ctx, &bucket, None, &["objectPut"], "objectPut", 25, false)
        .await
        .unwrap();
    assert_eq!(t.bucket_bytes("photos"), 25);

    drop(ctx);
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(t.bucket_bytes("photos"), 0);
}
