pub mod annotation_sink;

pub use annotation_sink::{AnnotationSink, NullAnnotationSink};
