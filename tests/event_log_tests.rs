use lb_lite::balancer::Engine;
use lb_lite::config::EngineConfig;

#[tokio::test]
async fn test_transitions_logged_in_order() {
    let engine = Engine::default();
    engine.configure(2, 1, 10).await.unwrap();
    engine.submit(0, 1, 1).await.unwrap();
    engine.fail_server(0).await.unwrap();
    engine.recover_server(0).await.unwrap();

    let messages = engine.log_messages().await;
    assert_eq!(
        messages,
        vec![
            "System configured with 2 servers and 1 clients.".to_string(),
            "Request 1 from Client 0 added to queue with priority 1".to_string(),
            "Request 1 assigned to Server 0".to_string(),
            "Server 0 is DOWN. 1 request(s) requeued.".to_string(),
            "Request 1 requeued after Server 0 failed".to_string(),
            "Request 1 assigned to Server 1".to_string(),
            "Server 0 is BACK ONLINE.".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_delay_logged_when_no_server_is_active() {
    let engine = Engine::default();
    engine.configure(0, 1, 1).await.unwrap();
    engine.submit(0, 5, 1).await.unwrap();

    let messages = engine.log_messages().await;
    assert_eq!(
        messages.last().map(String::as_str),
        Some("No active servers available. Request 5 delayed.")
    );
}

#[tokio::test]
async fn test_rejected_calls_log_nothing() {
    let engine = Engine::default();
    engine.configure(1, 1, 1).await.unwrap();
    engine.submit(0, 1, 1).await.unwrap();
    let before = engine.log_messages().await.len();

    assert!(engine.submit(0, 1, 1).await.is_err());
    assert!(engine.fail_server(7).await.is_err());
    assert!(engine.configure(-3, 0, 0).await.is_err());

    assert_eq!(engine.log_messages().await.len(), before);
}

#[tokio::test]
async fn test_log_survives_reconfiguration() {
    let engine = Engine::default();
    engine.configure(1, 0, 0).await.unwrap();
    engine.configure(2, 0, 0).await.unwrap();

    let messages = engine.log_messages().await;
    assert_eq!(messages.len(), 2);
    assert!(messages[1].contains("2 servers"));
}

#[tokio::test]
async fn test_log_is_bounded() {
    let engine = Engine::new(EngineConfig::default().with_max_log_entries(3));
    engine.configure(1, 0, 0).await.unwrap();
    for request_id in 0..5 {
        engine.submit(0, request_id, 1).await.unwrap();
    }

    let messages = engine.log_messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(
        messages.last().map(String::as_str),
        Some("Request 4 assigned to Server 0")
    );
}

#[tokio::test]
async fn test_rendered_log_has_one_timestamped_line_per_entry() {
    let engine = Engine::default();
    engine.configure(1, 0, 0).await.unwrap();
    engine.submit(0, 1, 1).await.unwrap();

    let text = engine.render_log().await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    for (line, entry) in lines.iter().zip(engine.logs().await) {
        assert!(line.ends_with(&format!(" - {}", entry.message)));
        assert!(line.contains('T'), "expected RFC 3339 timestamp: {}", line);
    }
}
