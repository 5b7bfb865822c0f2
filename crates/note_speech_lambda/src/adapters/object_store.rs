use std::time::Duration;

/// Tagged result of a storage read, so callers branch on "not found"
/// without inspecting service error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLookup<T> {
    Found(T),
    NotFound,
    Failure(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_length: Option<i64>,
}

pub trait ObjectStore {
    /// Metadata-only lookup; never transfers the body.
    fn head_object(&self, bucket: &str, key: &str) -> ObjectLookup<ObjectMetadata>;

    fn get_object(&self, bucket: &str, key: &str) -> ObjectLookup<Vec<u8>>;

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String>;
}

pub trait UrlPresigner {
    /// Time-limited URL allowing a single PUT of `key` with `content_type`.
    fn presign_put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, String>;
}
