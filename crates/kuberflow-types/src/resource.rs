use crate::Metadata;

/// A decoded, typed resource: metadata plus a user-defined spec and an
/// optional observed status.
///
/// `spec` is always present once a resource has been decoded; `status` may
/// be absent, most commonly right after creation before any controller has
/// written one back.
#[derive(Debug, Clone)]
pub struct CustomResource<T, U> {
    pub metadata: Metadata,
    pub spec: T,
    pub status: Option<U>,
}

impl<T, U> CustomResource<T, U> {
    pub fn new(metadata: Metadata, spec: T, status: Option<U>) -> Self {
        Self { metadata, spec, status }
    }
}
