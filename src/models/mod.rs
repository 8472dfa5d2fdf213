pub mod endpoint;
pub mod report;
pub mod response;
pub mod wire;

pub use endpoint::*;
pub use report::*;
pub use response::*;
