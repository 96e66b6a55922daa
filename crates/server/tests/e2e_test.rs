//! End-to-end pipeline tests: client -> ring -> TLS -> server -> processor

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use skiff_auth::{
    Certificate, CertificateOptions, CertificateSubject, PrivateKey, create_certificate,
};
use skiff_client::{TlsClient, TlsClientOptions};
use skiff_protocol::{Entry, EntryRef, Severity};
use skiff_server::{EntryProcessor, ProcessorError, TlsServer, TlsServerOptions};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helper Functions
// ============================================================================

struct TestCredentials {
    root_ca: Certificate,
    server_key: PrivateKey,
    server_cert: Certificate,
    client_key: PrivateKey,
    client_cert: Certificate,
}

/// Root CA plus a localhost server certificate and a client certificate
/// authorized for the given buckets.
fn credentials(bucket_ids: &[u32]) -> TestCredentials {
    let root_key = PrivateKey::generate().unwrap();
    let root_ca =
        create_certificate(&root_key, None, &CertificateOptions::root("Test Root"), None).unwrap();

    let server_key = PrivateKey::generate().unwrap();
    let server_cert = create_certificate(
        &root_key,
        Some(&root_ca),
        &CertificateOptions::server("localhost")
            .with_ip_addresses([IpAddr::from([127, 0, 0, 1])]),
        Some(CertificateSubject::Key(&server_key)),
    )
    .unwrap();

    let client_key = PrivateKey::generate().unwrap();
    let client_cert = create_certificate(
        &root_key,
        Some(&root_ca),
        &CertificateOptions::client("test-client").with_bucket_ids(bucket_ids),
        Some(CertificateSubject::Key(&client_key)),
    )
    .unwrap();

    TestCredentials {
        root_ca,
        server_key,
        server_cert,
        client_key,
        client_cert,
    }
}

/// Processor that copies every entry into a shared list.
#[derive(Default)]
struct CollectProcessor {
    entries: Mutex<Vec<Entry>>,
}

#[async_trait]
impl EntryProcessor for CollectProcessor {
    async fn process_entry(&self, entry: &EntryRef<'_>) -> Result<(), ProcessorError> {
        self.entries.lock().push(entry.to_entry());
        Ok(())
    }
}

impl CollectProcessor {
    fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.message().to_owned())
            .collect()
    }

    fn bucket_ids(&self) -> Vec<u32> {
        self.entries.lock().iter().map(Entry::bucket_id).collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

async fn start_server(
    creds: &TestCredentials,
    processor: Arc<CollectProcessor>,
) -> (std::net::SocketAddr, CancellationToken) {
    let options = TlsServerOptions::new(
        "127.0.0.1:0",
        creds.server_key.clone(),
        creds.server_cert.clone(),
        creds.root_ca.clone(),
        processor,
    );

    let server = TlsServer::bind(options).await.unwrap();
    let addr = server.local_addr();

    let cancel = CancellationToken::new();
    let run_cancel = cancel.clone();
    tokio::spawn(async move {
        let _ = server.run(run_cancel).await;
    });

    (addr, cancel)
}

fn start_client(creds: &TestCredentials, addr: std::net::SocketAddr) -> TlsClient {
    let mut options = TlsClientOptions::new(
        format!("127.0.0.1:{}", addr.port()),
        creds.client_key.clone(),
        creds.client_cert.clone(),
        creds.root_ca.clone(),
    );
    options.server_ack_timeout = Duration::from_millis(500);

    TlsClient::start(options).unwrap()
}

fn entry(bucket_id: u32, client: &TlsClient, message: &str) -> Entry {
    let mut entry = Entry::new();
    entry
        .set_bucket_id(bucket_id)
        .set_id(client.new_entry_id())
        .set_severity(Severity::Info)
        .set_message(message);
    entry
}

/// Poll until `check` passes or the deadline expires.
async fn wait_for(check: impl Fn() -> bool, deadline: Duration) {
    let start = tokio::time::Instant::now();

    while !check() {
        assert!(
            start.elapsed() < deadline,
            "condition not reached within {deadline:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

// ============================================================================
// Delivery
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_delivers_entries_in_order() {
    let creds = credentials(&[7]);
    let processor = Arc::new(CollectProcessor::default());
    let (addr, cancel) = start_server(&creds, Arc::clone(&processor)).await;
    let client = start_client(&creds, addr);

    for i in 0..5 {
        assert!(client.process_entry(&entry(7, &client, &format!("entry {i}"))));
    }

    wait_for(|| processor.len() == 5, Duration::from_secs(10)).await;

    assert_eq!(
        processor.messages(),
        vec!["entry 0", "entry 1", "entry 2", "entry 3", "entry 4"]
    );

    client.close().await;
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delivered_entries_survive_round_trip() {
    let creds = credentials(&[7]);
    let processor = Arc::new(CollectProcessor::default());
    let (addr, cancel) = start_server(&creds, Arc::clone(&processor)).await;
    let client = start_client(&creds, addr);

    let mut sent = entry(7, &client, "disk %s is full");
    sent.set_category_id(3)
        .push_tag("sda1")
        .push_metric("used_pct", 98)
        .push_meta("mount", "/var/log")
        .set_ttl_entry(14);
    client.process_entry(&sent);

    wait_for(|| processor.len() == 1, Duration::from_secs(10)).await;

    let received = processor.entries.lock()[0].clone();
    assert_eq!(received, sent);
    assert_eq!(received.render(), "disk sda1 is full");

    client.close().await;
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_graceful_close_drains_all_entries() {
    let creds = credentials(&[7]);
    let processor = Arc::new(CollectProcessor::default());
    let (addr, cancel) = start_server(&creds, Arc::clone(&processor)).await;
    let client = start_client(&creds, addr);

    for i in 0..100 {
        assert!(client.process_entry(&entry(7, &client, &format!("entry {i}"))));
    }

    client.close_graceful().await;

    // Everything enqueued before the close must have arrived.
    assert_eq!(processor.len(), 100);
    let messages = processor.messages();
    for (i, message) in messages.iter().enumerate() {
        assert_eq!(message, &format!("entry {i}"));
    }

    cancel.cancel();
}

// ============================================================================
// Bucket Authorization
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_forbidden_bucket_is_rejected() {
    let creds = credentials(&[7, 9]);
    let processor = Arc::new(CollectProcessor::default());
    let (addr, cancel) = start_server(&creds, Arc::clone(&processor)).await;
    let client = start_client(&creds, addr);

    client.process_entry(&entry(7, &client, "allowed 7"));
    client.process_entry(&entry(8, &client, "forbidden 8"));
    client.process_entry(&entry(9, &client, "allowed 9"));

    // Buckets 7 and 9 arrive (9 after a reconnect); 8 never does.
    wait_for(
        || {
            let buckets = processor.bucket_ids();
            buckets.contains(&7) && buckets.contains(&9)
        },
        Duration::from_secs(15),
    )
    .await;

    assert!(!processor.bucket_ids().contains(&8));

    client.close().await;
    cancel.cancel();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unrestricted_certificate_accepts_any_bucket() {
    let creds = credentials(&[]);
    let processor = Arc::new(CollectProcessor::default());
    let (addr, cancel) = start_server(&creds, Arc::clone(&processor)).await;
    let client = start_client(&creds, addr);

    client.process_entry(&entry(1234, &client, "any bucket"));

    wait_for(|| processor.len() == 1, Duration::from_secs(10)).await;
    assert_eq!(processor.bucket_ids(), vec![1234]);

    client.close().await;
    cancel.cancel();
}
