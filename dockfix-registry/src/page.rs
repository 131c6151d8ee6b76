/// One fetched page of registry results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryPage<T> {
    pub results: Vec<T>,
    /// Total entries across all pages, as reported by the server.
    pub total: u64,
    /// URL of the following page, if any.
    pub next: Option<String>,
}

impl<T> RegistryPage<T> {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}
