pub mod client;
pub use client::{BoxedRagClient, HttpRagClient, RagClient};

pub mod interpret;
pub use interpret::{Interpretation, interpret};

pub mod public;
pub use public::RagQuery;
