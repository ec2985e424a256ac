pub mod callbacks;
pub mod config;
pub mod dimred;
pub mod eigen;
pub mod error;
pub mod io;
pub mod methods;
pub mod neighbors;
pub mod progress;
mod utils;

pub use callbacks::Callbacks;
pub use config::{ParameterKey, Parameters};
pub use dimred::{embed, Embedding};
pub use error::{EmbeddingError, Result};
pub use methods::{EigenMethod, NeighborsMethod, ReductionMethod};
pub use progress::{LogProgress, NoProgress, ProgressLogger};
