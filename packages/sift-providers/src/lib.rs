pub mod tika;

mod error;

pub use error::{Error, Result};
