use crate::identity::ClientId;

/// Sorted-set key holding one client's sliding window for an action class
pub fn rate_limit_key(action: &str, client: &ClientId) -> String {
    format!("ratelimit:{}:{}", action, client.as_str())
}

/// Cached availability verdict for a slug, keyed case-insensitively
pub fn verdict_key(slug: &str) -> String {
    format!("slug_available:{}", slug.to_lowercase())
}

/// The store key for a job record by id
pub fn job_key(id: &str) -> String {
    format!("job:{}", id)
}

/// The list key backing a named job queue
pub fn queue_key(name: &str) -> String {
    format!("queue:{}", name)
}
