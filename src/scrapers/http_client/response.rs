//! HTTP response wrapper.

/// A fully read product page response.
///
/// The body is read eagerly so the response can be handed across the
/// fetch/verify phase boundary without holding a connection open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check if the status is inside the 2xx success range.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}
