pub mod error;
pub mod event;
pub mod state;
pub mod store;

pub use error::{HoldError, Result};
pub use event::PollEvent;
pub use state::{Origin, Reading, Sample, Series};
pub use store::KeyValueStore;
