//! # Prober Over Real Sockets
//!
//! The heartbeat prober with its TCP connector against loopback servers
//! that answer the probe in each way a real server can.

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bg_01_heartbeat_probe::{
        build_client_hello, build_malformed_heartbeat_request, Classification, HeartbeatProbeApi,
        HeartbeatProber, ProbeConfig, ProbeTarget, TcpConnector, TlsVersion,
    };

    use crate::support::{FakeTlsServer, ServerBehaviour};

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn prober(config: ProbeConfig) -> HeartbeatProber<TcpConnector> {
        HeartbeatProber::new(TcpConnector::new(), config).unwrap()
    }

    async fn probe(server: &FakeTlsServer, config: ProbeConfig) -> Classification {
        let target = ProbeTarget::new("127.0.0.1", server.port());
        let timeout = config.timeout;
        prober(config).probe(&target, timeout).await
    }

    async fn probe_behaviour(behaviour: ServerBehaviour) -> Classification {
        let server = FakeTlsServer::start(behaviour).await.unwrap();
        probe(&server, ProbeConfig::default().with_timeout(TIMEOUT)).await
    }

    // =========================================================================
    // CLASSIFICATION
    // =========================================================================

    #[tokio::test]
    async fn test_leaking_server_is_vulnerable() {
        assert_eq!(
            probe_behaviour(ServerBehaviour::Leak).await,
            Classification::Vulnerable
        );
    }

    #[tokio::test]
    async fn test_echoing_server_is_not_vulnerable() {
        assert_eq!(
            probe_behaviour(ServerBehaviour::Echo).await,
            Classification::NotVulnerable
        );
    }

    #[tokio::test]
    async fn test_alerting_server_is_not_vulnerable() {
        assert_eq!(
            probe_behaviour(ServerBehaviour::Alert).await,
            Classification::NotVulnerable
        );
    }

    #[tokio::test]
    async fn test_closing_server_is_not_vulnerable() {
        assert_eq!(
            probe_behaviour(ServerBehaviour::Close).await,
            Classification::NotVulnerable
        );
    }

    #[tokio::test]
    async fn test_garbage_is_inconclusive() {
        assert_eq!(
            probe_behaviour(ServerBehaviour::Garbage).await,
            Classification::Inconclusive
        );
    }

    #[tokio::test]
    async fn test_silent_server_times_out_inconclusive() {
        let server = FakeTlsServer::start(ServerBehaviour::Silent).await.unwrap();
        let started = Instant::now();
        let result = probe(
            &server,
            ProbeConfig::default().with_timeout(Duration::from_secs(1)),
        )
        .await;

        assert_eq!(result, Classification::Inconclusive);
        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_refused_connection_is_inconclusive() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let target = ProbeTarget::new("127.0.0.1", port);
        let result = prober(ProbeConfig::default()).probe(&target, TIMEOUT).await;
        assert_eq!(result, Classification::Inconclusive);
    }

    // =========================================================================
    // WIRE BYTES
    // =========================================================================

    #[tokio::test]
    async fn test_server_receives_exact_probe_for_each_version() {
        for version in TlsVersion::ALL {
            let server = FakeTlsServer::start(ServerBehaviour::Echo).await.unwrap();
            let config = ProbeConfig::default()
                .with_timeout(TIMEOUT)
                .with_tls_version(version);
            assert_eq!(probe(&server, config).await, Classification::NotVulnerable);

            let mut expected = build_client_hello(version);
            expected.extend(build_malformed_heartbeat_request(version));
            assert_eq!(server.wait_for_probes(1).await, vec![expected], "{version}");
        }
    }

    #[tokio::test]
    async fn test_probe_host_uses_configured_port() {
        let server = FakeTlsServer::start(ServerBehaviour::Leak).await.unwrap();
        let prober = prober(
            ProbeConfig::default()
                .with_port(server.port())
                .with_timeout(TIMEOUT),
        );
        assert_eq!(prober.probe_host("127.0.0.1").await, Classification::Vulnerable);
        assert_eq!(server.connections(), 1);
    }

    // =========================================================================
    // HANDSHAKE WAIT
    // =========================================================================

    #[tokio::test]
    async fn test_waits_for_server_hello_done() {
        let server = FakeTlsServer::start_with_handshake(ServerBehaviour::Leak)
            .await
            .unwrap();
        let config = ProbeConfig::default()
            .with_timeout(TIMEOUT)
            .with_await_server_hello_done(true);
        assert_eq!(probe(&server, config).await, Classification::Vulnerable);
    }

    #[tokio::test]
    async fn test_handshake_records_are_skipped_without_waiting() {
        let server = FakeTlsServer::start_with_handshake(ServerBehaviour::Echo)
            .await
            .unwrap();
        let config = ProbeConfig::default().with_timeout(TIMEOUT);
        assert_eq!(probe(&server, config).await, Classification::NotVulnerable);
    }
}
