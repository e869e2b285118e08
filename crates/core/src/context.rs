#![forbid(unsafe_code)]

/// Per-request values handed down explicitly by the application layer.
///
/// `actor_id` is an already authenticated user id; ownership checks compare it against
/// the author/reader recorded on the row being mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    actor_id: i64,
    request_id: Option<String>,
}

impl RequestContext {
    pub fn new(actor_id: i64) -> Self {
        Self {
            actor_id,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn actor_id(&self) -> i64 {
        self.actor_id
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_actor(&self, user_id: i64) -> bool {
        self.actor_id == user_id
    }
}
