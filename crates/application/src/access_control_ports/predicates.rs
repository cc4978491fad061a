use aclgate_domain::ResourceRef;

/// Caller-supplied classification of a resource as overdue.
///
/// Overdue semantics are resource-type specific, so the predicate is passed
/// per call and the store never interprets resource state itself. Any
/// `Fn(&ResourceRef) -> bool` closure is a predicate.
pub trait OverduePredicate: Send + Sync {
    /// Returns whether the resource is overdue.
    fn is_overdue(&self, resource: &ResourceRef) -> bool;
}

impl<F> OverduePredicate for F
where
    F: Fn(&ResourceRef) -> bool + Send + Sync,
{
    fn is_overdue(&self, resource: &ResourceRef) -> bool {
        self(resource)
    }
}
