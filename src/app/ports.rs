/// Outbound HTTP used by the API source. Blocking, so callers stay synchronous.
pub trait HttpClientPort: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}
