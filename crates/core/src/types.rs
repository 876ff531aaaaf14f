/// Local identifier of a job tracked by a client session.
///
/// Distinct from the remote handle (`hash`), which is only known once the
/// generation service accepts the request.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Allocate a new, time-ordered [`JobId`].
pub fn new_job_id() -> JobId {
    uuid::Uuid::now_v7()
}
