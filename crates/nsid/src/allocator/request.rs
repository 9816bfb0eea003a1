/// A single allocator operation, for callers that queue or forward requests.
///
/// See [`Allocator::execute`](crate::Allocator::execute).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AllocationRequest {
    /// Return the namespace's identifier, allocating one if it has none.
    GetOrAllocate { namespace: String },
    /// Record `id` for the namespace, replacing any existing identifier.
    ForceSet { namespace: String, id: String },
    /// Remove the namespace's entry.
    Delete { namespace: String },
}

impl AllocationRequest {
    pub fn namespace(&self) -> &str {
        match self {
            Self::GetOrAllocate { namespace }
            | Self::ForceSet { namespace, .. }
            | Self::Delete { namespace } => namespace,
        }
    }
}
