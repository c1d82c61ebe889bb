//! # Gate With The Remote Verification Service
//!
//! The interception gate dispatching to [`RemoteVerifier`] against an
//! in-process HTTP service.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bg_02_interception_gate::adapters::testing::{ConnectionEvent, RecordingConnection};
    use bg_02_interception_gate::{
        CacheConfig, CancelReason, GateConfig, GateOutcome, Host, InterceptionGate, RemoteConfig,
        RemoteVerifier, VerdictCache,
    };

    use crate::support::FakeVerificationService;

    fn gate(service: &FakeVerificationService, config: GateConfig) -> Arc<InterceptionGate> {
        let verifier = RemoteVerifier::new(&RemoteConfig {
            base_url: service.base_url().to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let cache = VerdictCache::with_config(&config.cache).unwrap();
        Arc::new(InterceptionGate::new(Arc::new(verifier), Arc::new(cache), config).unwrap())
    }

    #[tokio::test]
    async fn test_verdicts_follow_service_code() {
        let service = FakeVerificationService::builder()
            .safe("safe.example")
            .vulnerable("bad.example")
            .start()
            .await
            .unwrap();
        let gate = gate(&service, GateConfig::default());

        let safe = RecordingConnection::https("safe.example");
        let bad = RecordingConnection::https("bad.example");
        assert_eq!(gate.handle_attempt(safe.clone()).await, GateOutcome::Resumed);
        assert_eq!(gate.handle_attempt(bad.clone()).await, GateOutcome::Cancelled);

        assert_eq!(
            bad.events(),
            vec![
                ConnectionEvent::Suspended,
                ConnectionEvent::Cancelled(CancelReason::Vulnerable)
            ]
        );
        assert_eq!(
            gate.cache().lookup(&Host::parse("safe.example").unwrap()),
            Some(true)
        );
        assert_eq!(
            gate.cache().lookup(&Host::parse("bad.example").unwrap()),
            Some(false)
        );
    }

    #[tokio::test]
    async fn test_cached_host_is_not_requested_again() {
        let service = FakeVerificationService::builder()
            .safe("safe.example")
            .start()
            .await
            .unwrap();
        let gate = gate(&service, GateConfig::default());

        for expected in [GateOutcome::Resumed, GateOutcome::AllowedCached, GateOutcome::AllowedCached] {
            let conn = RecordingConnection::https("SAFE.example");
            assert_eq!(gate.handle_attempt(conn).await, expected);
        }
        assert_eq!(service.requests("safe.example"), 1);
    }

    #[tokio::test]
    async fn test_service_error_fails_open_without_caching() {
        let service = FakeVerificationService::builder()
            .status("flaky.example", 503)
            .start()
            .await
            .unwrap();
        let gate = gate(&service, GateConfig::default());

        for _ in 0..2 {
            let conn = RecordingConnection::https("flaky.example");
            assert_eq!(
                gate.handle_attempt(conn.clone()).await,
                GateOutcome::ResumedOnError
            );
            assert_eq!(conn.resume_count(), 1);
        }
        assert_eq!(service.requests("flaky.example"), 2);
        assert!(gate.cache().is_empty());
    }

    #[tokio::test]
    async fn test_slow_service_hits_gate_timeout() {
        let service = FakeVerificationService::builder()
            .slow("slow.example", Duration::from_secs(3), 0)
            .start()
            .await
            .unwrap();
        let gate = gate(
            &service,
            GateConfig::default().with_verify_timeout(Duration::from_millis(300)),
        );

        let conn = RecordingConnection::https("slow.example");
        assert_eq!(
            gate.handle_attempt(conn.clone()).await,
            GateOutcome::ResumedOnError
        );
        assert!(gate.cache().is_empty());
    }

    #[tokio::test]
    async fn test_independent_hosts_verified_concurrently() {
        let service = FakeVerificationService::builder()
            .slow("a.example", Duration::from_millis(400), 1)
            .slow("b.example", Duration::from_millis(400), 0)
            .start()
            .await
            .unwrap();
        let gate = gate(&service, GateConfig::default());

        let a = RecordingConnection::https("a.example");
        let b = RecordingConnection::https("b.example");
        let started = std::time::Instant::now();
        let (ra, rb) = tokio::join!(gate.handle_attempt(a.clone()), gate.handle_attempt(b.clone()));

        assert_eq!(ra, GateOutcome::Resumed);
        assert_eq!(rb, GateOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_bounded_cache_reverifies_evicted_host() {
        let service = FakeVerificationService::builder()
            .safe("a.example")
            .safe("b.example")
            .start()
            .await
            .unwrap();
        let gate = gate(
            &service,
            GateConfig::default().with_cache(CacheConfig {
                ttl: None,
                max_entries: Some(1),
            }),
        );

        for host in ["a.example", "b.example", "a.example"] {
            let conn = RecordingConnection::https(host);
            assert_eq!(gate.handle_attempt(conn).await, GateOutcome::Resumed);
        }
        assert_eq!(service.requests("a.example"), 2);
        assert_eq!(service.requests("b.example"), 1);
    }
}
