use uuid::Uuid;

/// The authenticated user on whose behalf a request runs. Identity is
/// established upstream; this service only consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub is_staff: bool,
}
