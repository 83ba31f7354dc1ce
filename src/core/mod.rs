pub mod error;
pub mod types;
pub mod value;

pub use error::{BindError, Result};
pub use types::{ResultSet, Row};
pub use value::{DataType, Value};
