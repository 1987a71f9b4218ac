use orbit_api_schema::error::ApiErrorCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<T> {
    Idle,
    Pending,
    Success(T),
    Error(ApiErrorCode),
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        MutationState::Idle
    }
}

impl<T> MutationState<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }

    /// Moves to `Pending`. Returns false, leaving the state alone, while a
    /// call is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.is_pending() {
            return false;
        }
        *self = MutationState::Pending;
        true
    }

    pub fn settle(&mut self, result: Result<T, ApiErrorCode>) {
        *self = match result {
            Ok(value) => MutationState::Success(value),
            Err(code) => MutationState::Error(code),
        };
    }

    pub fn reset(&mut self) {
        *self = MutationState::Idle;
    }
}
