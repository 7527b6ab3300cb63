use crate::models::ClusterKey;

/// Receives "this cluster needs more human description" signals.
///
/// Signals are fire-and-forget: the caller never waits on, or learns the
/// outcome of, a request.
pub trait AnnotationSink {
    /// Record that `cluster` was observed with the given description density.
    fn request_annotation(&mut self, cluster: ClusterKey, description_density: f64);
}

/// Sink that drops every signal, for read-only queries.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnnotationSink;

impl AnnotationSink for NullAnnotationSink {
    fn request_annotation(&mut self, _cluster: ClusterKey, _description_density: f64) {}
}
