pub mod state;
pub mod task;

#[cfg(test)]
pub mod fakes;

pub use state::SamplerSettings;
pub use task::{spawn, SamplerHandle};
