mod config;
pub use config::*;

mod system;
pub use system::*;

mod upload;
pub use upload::*;

mod tools;
pub use tools::*;
