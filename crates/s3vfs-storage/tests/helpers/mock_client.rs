use async_trait::async_trait;
use bytes::Bytes;
use s3vfs_storage::{ListPage, ObjectClient, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A stored object as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory [`ObjectClient`] that records how often it is called.
///
/// Listing is split into pages of `page_size` keys with numeric continuation tokens, so
/// pagination is exercised without a real bucket.
pub struct MockObjectClient {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
    calls: AtomicUsize,
    list_calls: AtomicUsize,
    page_size: usize,
    fail_presign: bool,
}

impl MockObjectClient {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
            calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            page_size: 1000,
            fail_presign: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn failing_presign(mut self) -> Self {
        self.fail_presign = true;
        self
    }

    /// Seed an object without counting it as a call.
    pub fn insert(&self, key: &str, body: &[u8]) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: Bytes::copy_from_slice(body),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Total number of client calls made by the adapter
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectClient for MockObjectClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.record();
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        self.record();
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn head_object(&self, key: &str) -> StorageResult<bool> {
        self.record();
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> StorageResult<ListPage> {
        self.record();
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let offset = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| StorageError::BackendError(format!("bad token {}", token)))?,
            None => 0,
        };

        let matching: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();

        let end = (offset + self.page_size).min(matching.len());
        let keys = matching.get(offset..end).unwrap_or_default().to_vec();
        let next_token = (end < matching.len()).then(|| end.to_string());

        Ok(ListPage { keys, next_token })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        self.record();
        if self.fail_presign {
            return Err(StorageError::Presign("no credentials available".to_string()));
        }
        Ok(format!(
            "https://{}.s3.amazonaws.com/{}?X-Amz-Expires={}",
            self.bucket,
            key,
            expires_in.as_secs()
        ))
    }
}
