/// Server-issued session identifier; scopes the progress stream.
pub type ClientId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
