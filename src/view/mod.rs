/// View layer: requests for derived artifacts and their computation.
///
/// A [`ViewRequest`](request::ViewRequest) names a desired artifact
/// (summary table, missing-value report, histogram, correlation matrix);
/// [`compute`](compute::compute) derives it from a table. Artifacts are
/// plain serializable values consumed by an external renderer.

pub mod artifact;
pub mod compute;
pub mod request;

pub use artifact::Artifact;
pub use compute::compute;
pub use request::ViewRequest;
