//! # Configured Runtime
//!
//! [`GuardRuntime`] built from TOML text, fed URLs as the `gate` command
//! would feed them from stdin.

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use bg_02_interception_gate::{DispatchError, Host};
    use bg_runtime::{spawn_line_source, GuardConfig, GuardRuntime, StrategyKind};

    use crate::support::{FakeTlsServer, FakeVerificationService, ServerBehaviour};

    fn lines(text: &str) -> Cursor<Vec<u8>> {
        Cursor::new(text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_local_strategy_from_toml() {
        let server = FakeTlsServer::start(ServerBehaviour::Leak).await.unwrap();
        let config = GuardConfig::parse(&format!(
            r#"
            strategy = "local"

            [probe]
            port = {port}
            timeout = "2s"
            "#,
            port = server.port()
        ))
        .unwrap();
        let runtime = GuardRuntime::new(config).unwrap();

        let input = "https://127.0.0.1/\nhttps://127.0.0.1/again\nhttp://127.0.0.1/\n";
        let stats = runtime
            .serve(spawn_line_source(lines(input), 8), std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(stats.observed, 3);
        assert_eq!(stats.passed_through, 1);
        assert_eq!(stats.cancelled + stats.cache_hits_unsafe, 2);
        assert_eq!(stats.settled(), stats.observed);
    }

    #[tokio::test]
    async fn test_remote_strategy_with_env_overrides() {
        let service = FakeVerificationService::builder()
            .safe("safe.example")
            .vulnerable("bad.example")
            .start()
            .await
            .unwrap();

        let mut config = GuardConfig::parse("strategy = \"local\"").unwrap();
        let url = service.base_url().to_string();
        config
            .apply_overrides(|key| match key {
                "BG_STRATEGY" => Some("remote".to_string()),
                "BG_REMOTE_URL" => Some(url.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.strategy, StrategyKind::Remote);

        let runtime = GuardRuntime::new(config).unwrap();
        assert_eq!(
            runtime.check(&Host::parse("safe.example").unwrap()).await,
            Ok(true)
        );
        assert_eq!(
            runtime.check(&Host::parse("bad.example").unwrap()).await,
            Ok(false)
        );
        assert_eq!(
            runtime.check(&Host::parse("unknown.example").unwrap()).await,
            Err(DispatchError::VerificationService { status: 404 })
        );
    }

    #[tokio::test]
    async fn test_shutdown_releases_pending_attempts() {
        let service = FakeVerificationService::builder()
            .slow("slow.example", Duration::from_secs(30), 1)
            .start()
            .await
            .unwrap();
        let mut config = GuardConfig::default();
        config.remote.base_url = service.base_url().to_string();
        config.remote.timeout = Duration::from_secs(60);
        config.gate.verify_timeout = Duration::from_secs(60);
        let runtime = GuardRuntime::new(config).unwrap();

        // Input stays open so only the shutdown signal can end the run
        let (reader, mut writer) = tokio::io::duplex(1024);
        tokio::io::AsyncWriteExt::write_all(&mut writer, b"https://slow.example/\n")
            .await
            .unwrap();
        let source = spawn_line_source(tokio::io::BufReader::new(reader), 8);

        let shutdown = tokio::time::sleep(Duration::from_millis(300));
        let stats = runtime.serve(source, shutdown).await.unwrap();

        assert_eq!(stats.observed, 1);
        assert_eq!(stats.released_on_shutdown, 1);
        drop(writer);
    }
}
