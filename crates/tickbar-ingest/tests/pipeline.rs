//! End-to-end tests of the ingestion loop over in-process transports and sinks.

use async_trait::async_trait;
use std::time::Duration;
use tickbar_aggregate::{LatePolicy, OhlcvSummary};
use tickbar_ingest::{
    ChannelItem, ChannelSource, IngestConfig, IngestStats, IngestionLoop, LineSource, RawMessage,
};
use tickbar_sink::{
    CacheSink, DispatchMode, DocumentSink, JsonlSink, MemoryCache, MemoryDocumentStore, Sink,
    SinkDispatcher, SummaryPayload,
};
use tickbar_types::{SinkError, TransportError};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

struct FailingSink;

#[async_trait]
impl Sink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(&self, _summary: &OhlcvSummary) -> Result<(), SinkError> {
        Err(SinkError::Rejected("always fails".to_string()))
    }
}

fn fast_config() -> IngestConfig {
    IngestConfig {
        recv_timeout: Duration::from_millis(20),
        reconnect_delay: Duration::from_millis(10),
        ..IngestConfig::default()
    }
}

fn tick(symbol: &str, price: f64, volume: f64, timestamp: &str) -> ChannelItem {
    let payload = format!(
        r#"{{"symbol":"{symbol}","price":{price},"volume":{volume},"timestamp":"{timestamp}"}}"#
    );
    Ok(RawMessage::new("ticks", payload))
}

async fn send_all(sender: &Sender<ChannelItem>, items: Vec<ChannelItem>) {
    for item in items {
        sender.send(item).await.unwrap();
    }
}

/// Runs a loop over `items` until the channel is exhausted.
async fn run_to_end(
    items: Vec<ChannelItem>,
    dispatcher: SinkDispatcher,
    config: IngestConfig,
) -> IngestStats {
    let (sender, source) = ChannelSource::channel(items.len().max(1));
    send_all(&sender, items).await;
    drop(sender);

    let ingestion = IngestionLoop::new(source, dispatcher, config, CancellationToken::new());
    tokio::time::timeout(Duration::from_secs(5), ingestion.run())
        .await
        .expect("ingestion should finish")
}

fn document_dispatcher(store: &MemoryDocumentStore) -> SinkDispatcher {
    SinkDispatcher::new(DispatchMode::Sequential).with_sink(DocumentSink::new(store.clone()))
}

#[tokio::test]
async fn test_drain_flushes_every_symbol() {
    let store = MemoryDocumentStore::new();
    let stats = run_to_end(
        vec![
            tick("A", 10.0, 1.0, "2024-01-01T09:30:10Z"),
            tick("B", 20.0, 2.0, "2024-01-01T09:30:20Z"),
            tick("A", 11.0, 3.0, "2024-01-01T09:30:40Z"),
        ],
        document_dispatcher(&store),
        fast_config(),
    )
    .await;

    assert_eq!(stats.received, 3);
    assert_eq!(stats.drained, 2);
    assert_eq!(stats.rolled, 0);

    let mut documents = store.documents();
    documents.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].symbol, "A");
    assert_eq!(documents[0].tick_count, 2);
    assert_eq!(documents[0].close, 11.0);
    assert_eq!(documents[0].volume, 4.0);
    assert_eq!(documents[1].symbol, "B");
    assert_eq!(documents[1].tick_count, 1);
}

#[tokio::test]
async fn test_rollover_seals_previous_minute() {
    let cache = MemoryCache::new();
    let dispatcher =
        SinkDispatcher::new(DispatchMode::Sequential).with_sink(CacheSink::new(cache.clone()));

    let stats = run_to_end(
        vec![
            tick("XYZ", 10.0, 100.0, "2024-01-01T09:30:59Z"),
            tick("XYZ", 10.5, 50.0, "2024-01-01T09:31:01Z"),
            tick("XYZ", 10.7, 25.0, "2024-01-01T09:33:00Z"),
        ],
        dispatcher,
        fast_config(),
    )
    .await;

    assert_eq!(stats.rolled, 2);
    assert_eq!(stats.drained, 1);
    assert_eq!(stats.dispatched, 3);

    let channels: Vec<_> = cache.published().into_iter().map(|(c, _)| c).collect();
    assert_eq!(channels, vec!["XYZ:aggregated"; 3]);
    assert!(cache.get("XYZ:20240101_0930").is_some());
    assert!(cache.get("XYZ:20240101_0931").is_some());
    assert!(cache.get("XYZ:20240101_0932").is_none());
    assert!(cache.get("XYZ:20240101_0933").is_some());
}

#[tokio::test]
async fn test_invalid_messages_never_reach_a_window() {
    let store = MemoryDocumentStore::new();
    let stats = run_to_end(
        vec![
            Ok(RawMessage::new(
                "ticks",
                r#"{"symbol":"XYZ","price":10.0,"timestamp":"2024-01-01T09:30:00Z"}"#,
            )),
            Ok(RawMessage::new("ticks", "not json")),
            tick("XYZ", 10.0, 1.0, "yesterday"),
            tick("XYZ", 12.0, 1.0, "2024-01-01T09:30:30Z"),
        ],
        document_dispatcher(&store),
        fast_config(),
    )
    .await;

    assert_eq!(stats.received, 4);
    assert_eq!(stats.parse_failures, 3);
    assert_eq!(stats.accepted, 1);

    let documents = store.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].tick_count, 1);
    assert_eq!(documents[0].open, 12.0);
}

#[tokio::test]
async fn test_late_ticks_follow_policy() {
    let items = || {
        vec![
            tick("XYZ", 10.0, 1.0, "2024-01-01T09:31:10Z"),
            tick("XYZ", 99.0, 1.0, "2024-01-01T09:30:50Z"),
            tick("XYZ", 11.0, 1.0, "2024-01-01T09:31:20Z"),
        ]
    };

    let store = MemoryDocumentStore::new();
    let stats = run_to_end(items(), document_dispatcher(&store), fast_config()).await;
    assert_eq!(stats.late_rejected, 1);
    assert_eq!(store.documents()[0].high, 11.0);

    let store = MemoryDocumentStore::new();
    let config = IngestConfig {
        late_policy: LatePolicy::AppendToCurrent,
        ..fast_config()
    };
    let stats = run_to_end(items(), document_dispatcher(&store), config).await;
    assert_eq!(stats.late_rejected, 0);
    let documents = store.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].tick_count, 3);
    assert_eq!(documents[0].high, 99.0);
}

#[tokio::test]
async fn test_unsubscribed_symbols_are_ignored() {
    let store = MemoryDocumentStore::new();
    let stats = run_to_end(
        vec![
            tick("BTCUSDT", 45_000.0, 0.1, "2024-01-01T09:30:00Z"),
            tick("DOGEUSDT", 0.08, 1_000.0, "2024-01-01T09:30:01Z"),
        ],
        document_dispatcher(&store),
        fast_config().with_symbols(["BTCUSDT"]),
    )
    .await;

    assert_eq!(stats.unsubscribed, 1);
    let documents = store.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].symbol, "BTCUSDT");
}

#[tokio::test]
async fn test_sink_failure_is_isolated() {
    for mode in [DispatchMode::Sequential, DispatchMode::Concurrent] {
        let store = MemoryDocumentStore::new();
        let dispatcher = SinkDispatcher::new(mode)
            .with_sink(FailingSink)
            .with_sink(DocumentSink::new(store.clone()));

        let stats = run_to_end(
            vec![
                tick("XYZ", 10.0, 1.0, "2024-01-01T09:30:00Z"),
                tick("XYZ", 10.0, 1.0, "2024-01-01T09:31:00Z"),
            ],
            dispatcher,
            fast_config(),
        )
        .await;

        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.sink_failures, 2);
        assert_eq!(store.documents().len(), 2);
    }
}

#[tokio::test]
async fn test_drain_continues_past_failing_sink() {
    for mode in [DispatchMode::Sequential, DispatchMode::Concurrent] {
        let store = MemoryDocumentStore::new();
        let dispatcher = SinkDispatcher::new(mode)
            .with_sink(FailingSink)
            .with_sink(DocumentSink::new(store.clone()));

        let stats = run_to_end(
            vec![
                tick("A", 10.0, 1.0, "2024-01-01T09:30:00Z"),
                tick("B", 20.0, 2.0, "2024-01-01T09:30:10Z"),
                tick("A", 11.0, 1.0, "2024-01-01T09:30:20Z"),
            ],
            dispatcher,
            fast_config(),
        )
        .await;

        assert_eq!(stats.rolled, 0);
        assert_eq!(stats.drained, 2);
        assert_eq!(stats.dispatched, 2);
        assert_eq!(stats.sink_failures, 2);

        let mut symbols: Vec<_> = store.documents().into_iter().map(|d| d.symbol).collect();
        symbols.sort();
        assert_eq!(symbols, vec!["A", "B"], "{mode:?}");
    }
}

#[tokio::test]
async fn test_transport_error_backs_off_and_recovers() {
    let store = MemoryDocumentStore::new();
    let stats = run_to_end(
        vec![
            tick("XYZ", 10.0, 1.0, "2024-01-01T09:30:00Z"),
            Err(TransportError::Disconnected("connection reset".to_string())),
            tick("XYZ", 10.5, 1.0, "2024-01-01T09:30:05Z"),
        ],
        document_dispatcher(&store),
        fast_config(),
    )
    .await;

    assert_eq!(stats.transport_errors, 1);
    assert_eq!(stats.accepted, 2);
    assert_eq!(store.documents()[0].tick_count, 2);
}

#[tokio::test]
async fn test_cancellation_drains_open_windows() {
    let store = MemoryDocumentStore::new();
    let (sender, source) = ChannelSource::channel(8);
    let cancel = CancellationToken::new();
    let ingestion = IngestionLoop::new(
        source,
        document_dispatcher(&store),
        fast_config(),
        cancel.clone(),
    );
    let handle = tokio::spawn(ingestion.run());

    send_all(
        &sender,
        vec![
            tick("A", 1.0, 1.0, "2024-01-01T09:30:00Z"),
            tick("B", 2.0, 1.0, "2024-01-01T09:30:00Z"),
        ],
    )
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop should stop after cancellation")
        .unwrap();

    assert_eq!(stats.drained, 2);
    assert_eq!(store.documents().len(), 2);
    drop(sender);
}

#[tokio::test]
async fn test_ticks_after_cancellation_are_not_aggregated() {
    let store = MemoryDocumentStore::new();
    let (sender, source) = ChannelSource::channel(8);
    let cancel = CancellationToken::new();
    let ingestion = IngestionLoop::new(
        source,
        document_dispatcher(&store),
        fast_config(),
        cancel.clone(),
    );
    let handle = tokio::spawn(ingestion.run());

    send_all(&sender, vec![tick("A", 1.0, 1.0, "2024-01-01T09:30:00Z")]).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    cancel.cancel();
    for item in [
        tick("A", 5.0, 1.0, "2024-01-01T09:30:30Z"),
        tick("A", 6.0, 1.0, "2024-01-01T09:31:00Z"),
        tick("C", 3.0, 1.0, "2024-01-01T09:30:00Z"),
    ] {
        // The loop may already have dropped its receiver.
        let _ = sender.send(item).await;
    }

    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop should stop after cancellation")
        .unwrap();

    assert_eq!(stats.received, 1);
    assert_eq!(stats.rolled, 0);
    assert_eq!(stats.drained, 1);

    let documents = store.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].symbol, "A");
    assert_eq!(documents[0].tick_count, 1);
    assert_eq!(documents[0].close, 1.0);
}

#[tokio::test]
async fn test_cancellation_interrupts_backoff() {
    let (sender, source) = ChannelSource::channel(4);
    let cancel = CancellationToken::new();
    let config = IngestConfig {
        reconnect_delay: Duration::from_secs(3600),
        ..fast_config()
    };
    let ingestion = IngestionLoop::new(
        source,
        SinkDispatcher::new(DispatchMode::Sequential),
        config,
        cancel.clone(),
    );
    let handle = tokio::spawn(ingestion.run());

    sender
        .send(Err(TransportError::Disconnected("down".to_string())))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("backoff should observe cancellation")
        .unwrap();
    assert_eq!(stats.transport_errors, 1);
}

#[tokio::test]
async fn test_line_source_into_jsonl_files() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let sink = JsonlSink::new(temp_dir.path());
    let dispatcher = SinkDispatcher::new(DispatchMode::Concurrent).with_sink(sink.clone());
    dispatcher.check_ready().await.unwrap();

    let input = concat!(
        r#"{"symbol":"XYZ","price":10.0,"volume":100,"timestamp":"2024-01-01T09:30:15Z"}"#,
        "\n",
        r#"{"symbol":"XYZ","price":10.5,"volume":50,"timestamp":"2024-01-01T09:30:45Z"}"#,
        "\n\n",
        r#"{"symbol":"XYZ","price":9.8,"volume":75,"timestamp":"2024-01-01T09:30:30Z"}"#,
        "\n",
        r#"{"symbol":"XYZ","price":10.2,"volume":60,"timestamp":"2024-01-01T09:30:59Z"}"#,
        "\n",
    );
    let source = LineSource::new("stdin", input.as_bytes());
    let stats = IngestionLoop::new(source, dispatcher, fast_config(), CancellationToken::new())
        .run()
        .await;
    assert_eq!(stats.received, 4);

    let content = std::fs::read_to_string(sink.path_for("XYZ")).unwrap();
    let payloads: Vec<SummaryPayload> = content
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(payloads.len(), 1);
    let summary = &payloads[0];
    assert_eq!(summary.timestamp, "2024-01-01T09:30:00Z");
    assert_eq!(summary.open, 10.0);
    assert_eq!(summary.high, 10.5);
    assert_eq!(summary.low, 9.8);
    assert_eq!(summary.close, 10.2);
    assert_eq!(summary.volume, 285.0);
    assert_eq!(summary.tick_count, 4);
}
