pub mod engine;
pub mod features;
pub mod pipeline;

pub use engine::*;
pub use features::*;
pub use pipeline::*;
