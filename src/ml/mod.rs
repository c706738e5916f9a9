//! Feature encoding, the linear attrition classifier, and its persistence.
//!
//! Training and serving share one contract: the ordered feature names fitted
//! by the encoder travel inside the model artifact and fix the vector layout
//! every scoring request must follow.

pub mod artifact;
pub mod encoder;
pub mod logreg;
pub mod metrics;
pub mod schema;
