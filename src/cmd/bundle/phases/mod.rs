pub mod build_graph;
pub mod complete_bundling;
pub mod emit_bundle;

/// Represents a phase in the bundling process.
pub trait BundlingPhase: Sized {}

pub use {
    build_graph::BuildGraph,
    complete_bundling::CompleteBundling,
    emit_bundle::EmitBundle,
};
