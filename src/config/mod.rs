pub mod types;
pub mod catalog;
pub mod loader;
pub mod settings;
pub mod validator;

pub use types::*;
pub use catalog::*;
pub use loader::*;
pub use settings::*;
pub use validator::*;
