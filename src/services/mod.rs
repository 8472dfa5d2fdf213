pub mod executor;
pub mod interpolation;
pub mod jwt;
pub mod loader;
pub mod runner;
pub mod validator;

pub use executor::{CallResult, Executor, ExecutorConfig, HttpExecutor};
pub use interpolation::{expand, ResolvedRequest};
pub use jwt::TokenProvider;
pub use loader::{load_endpoints, parse_endpoints, render_endpoints, LoadOutcome};
pub use runner::{run_once, RunOutcome, Runner};
pub use validator::{
    FormatValidator, SchemaValidator, StatusValidator, ValidationEngine, Validator,
};
