use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use camino::Utf8PathBuf;

use taxodl::batch::{BatchDownloader, BatchOptions};
use taxodl::domain::{Accession, QueryMode};
use taxodl::error::TaxoError;
use taxodl::interpro::{Fetcher, HttpReply, HttpTransport, RetryPolicy, Sleeper};
use taxodl::store::ArtifactStore;

struct ScriptedTransport {
    replies: Mutex<Vec<Result<HttpReply, TaxoError>>>,
    calls: Mutex<u32>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Result<HttpReply, TaxoError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: Mutex::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl HttpTransport for &ScriptedTransport {
    fn get(&self, _url: &str) -> Result<HttpReply, TaxoError> {
        *self.calls.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Err(TaxoError::Http("script exhausted".to_string()))
        } else {
            replies.remove(0)
        }
    }
}

#[derive(Default)]
struct RecordingSleeper {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn count(&self) -> usize {
        self.pauses.lock().unwrap().len()
    }
}

impl Sleeper for &RecordingSleeper {
    fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

fn ok(body: &str) -> Result<HttpReply, TaxoError> {
    Ok(HttpReply {
        status: 200,
        body: body.to_string(),
    })
}

fn status(code: u16) -> Result<HttpReply, TaxoError> {
    Ok(HttpReply {
        status: code,
        body: String::new(),
    })
}

fn accessions(items: &[&str]) -> Vec<Accession> {
    items.iter().map(|s| s.parse().unwrap()).collect()
}

fn temp_store(temp: &tempfile::TempDir) -> ArtifactStore {
    let root = Utf8PathBuf::from_path_buf(temp.path().join("artifacts")).unwrap();
    ArtifactStore::new(root)
}

fn downloader<'a>(
    store: ArtifactStore,
    transport: &'a ScriptedTransport,
    retry_sleeper: &'a RecordingSleeper,
    pacer: &'a RecordingSleeper,
    force: bool,
) -> BatchDownloader<&'a ScriptedTransport, &'a RecordingSleeper, &'a RecordingSleeper> {
    let policy = RetryPolicy {
        max_attempts: 3,
        retry_delay: Duration::from_secs(10),
        timeout_backoff: Duration::from_secs(61),
    };
    let fetcher = Fetcher::new(transport, retry_sleeper, policy);
    let options = BatchOptions {
        force,
        request_pause: Duration::from_secs(1),
    };
    BatchDownloader::new(store, fetcher, pacer, "http://example/api".to_string(), options)
}

#[test]
fn existing_artifact_is_skipped_without_network_calls() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    store.ensure_root().unwrap();

    let acc: Accession = "IPR000001".parse().unwrap();
    store
        .write(&acc, QueryMode::Taxonomy, &serde_json::json!({ "count": 7 }))
        .unwrap();
    let path = store.artifact_path(&acc, QueryMode::Taxonomy);
    let before = fs::read(path.as_std_path()).unwrap();

    let transport = ScriptedTransport::new(vec![]);
    let retry_sleeper = RecordingSleeper::default();
    let pacer = RecordingSleeper::default();
    let dl = downloader(store.clone(), &transport, &retry_sleeper, &pacer, false);

    let summary = dl.run(&accessions(&["IPR000001"]), QueryMode::Taxonomy).unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.saved, 0);
    assert_eq!(transport.call_count(), 0);
    // no pause after a skip
    assert_eq!(pacer.count(), 0);

    let after = fs::read(path.as_std_path()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn failed_item_is_logged_and_batch_continues() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let transport = ScriptedTransport::new(vec![
        status(500),
        status(500),
        status(500),
        ok("{\"count\": 1, \"results\": []}"),
    ]);
    let retry_sleeper = RecordingSleeper::default();
    let pacer = RecordingSleeper::default();
    let dl = downloader(store.clone(), &transport, &retry_sleeper, &pacer, false);

    let summary = dl
        .run(&accessions(&["IPR000001", "IPR000002"]), QueryMode::Taxonomy)
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].accession.as_str(), "IPR000001");

    let first: Accession = "IPR000001".parse().unwrap();
    let second: Accession = "IPR000002".parse().unwrap();
    assert!(!store.exists(&first, QueryMode::Taxonomy));
    assert!(store.exists(&second, QueryMode::Taxonomy));
    // one pause after the failure, one after the save
    assert_eq!(pacer.count(), 2);
    // two retry delays inside the failed fetch
    assert_eq!(retry_sleeper.count(), 2);
}

#[test]
fn invalid_json_body_is_a_per_item_failure() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let transport = ScriptedTransport::new(vec![ok("<html>not json</html>")]);
    let retry_sleeper = RecordingSleeper::default();
    let pacer = RecordingSleeper::default();
    let dl = downloader(store.clone(), &transport, &retry_sleeper, &pacer, false);

    let summary = dl.run(&accessions(&["IPR000001"]), QueryMode::Taxonomy).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.saved, 0);

    let acc: Accession = "IPR000001".parse().unwrap();
    assert!(!store.exists(&acc, QueryMode::Taxonomy));
}

#[test]
fn force_refetches_and_overwrites() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    store.ensure_root().unwrap();

    let acc: Accession = "IPR000001".parse().unwrap();
    store
        .write(&acc, QueryMode::Taxonomy, &serde_json::json!({ "count": 1 }))
        .unwrap();

    let transport = ScriptedTransport::new(vec![ok("{\"count\": 2}")]);
    let retry_sleeper = RecordingSleeper::default();
    let pacer = RecordingSleeper::default();
    let dl = downloader(store.clone(), &transport, &retry_sleeper, &pacer, true);

    let summary = dl.run(&accessions(&["IPR000001"]), QueryMode::Taxonomy).unwrap();
    assert_eq!(summary.saved, 1);
    assert_eq!(transport.call_count(), 1);

    let value = store.read_value(&acc, QueryMode::Taxonomy).unwrap();
    assert_eq!(value["count"], 2);
}

#[test]
fn second_run_is_idempotent() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);

    let transport = ScriptedTransport::new(vec![ok("{\"count\": 9, \"results\": []}")]);
    let retry_sleeper = RecordingSleeper::default();
    let pacer = RecordingSleeper::default();
    let dl = downloader(store.clone(), &transport, &retry_sleeper, &pacer, false);
    dl.run(&accessions(&["IPR000001"]), QueryMode::Taxonomy).unwrap();

    let acc: Accession = "IPR000001".parse().unwrap();
    let path = store.artifact_path(&acc, QueryMode::Taxonomy);
    let first_bytes = fs::read(path.as_std_path()).unwrap();

    // empty script: any further network call would fail the run
    let transport2 = ScriptedTransport::new(vec![]);
    let dl2 = downloader(store.clone(), &transport2, &retry_sleeper, &pacer, false);
    let summary = dl2.run(&accessions(&["IPR000001"]), QueryMode::Taxonomy).unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(transport2.call_count(), 0);
    assert_eq!(fs::read(path.as_std_path()).unwrap(), first_bytes);
}

#[test]
fn modes_do_not_share_completion() {
    let temp = tempfile::tempdir().unwrap();
    let store = temp_store(&temp);
    store.ensure_root().unwrap();

    let acc: Accession = "IPR000001".parse().unwrap();
    store
        .write(&acc, QueryMode::Taxonomy, &serde_json::json!({}))
        .unwrap();

    // the cellorg family is still pending for the same accession
    let transport = ScriptedTransport::new(vec![ok("{\"count\": 4}")]);
    let retry_sleeper = RecordingSleeper::default();
    let pacer = RecordingSleeper::default();
    let dl = downloader(store.clone(), &transport, &retry_sleeper, &pacer, false);

    let summary = dl
        .run(&accessions(&["IPR000001"]), QueryMode::TaxonomyByCellOrg)
        .unwrap();
    assert_eq!(summary.saved, 1);
    assert!(store.exists(&acc, QueryMode::TaxonomyByCellOrg));
}
