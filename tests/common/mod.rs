pub mod server;

use endpoint_probe::models::{Endpoint, EndpointResponse};
use endpoint_probe::services::Executor;

#[allow(unused_imports)]
pub use server::{MockServer, SLOW_LOGIN_DELAY};

/// Execute an endpoint whose every resolved request must get a response
#[allow(dead_code)]
pub async fn responses(executor: &dyn Executor, endpoint: &Endpoint) -> Vec<EndpointResponse> {
    executor
        .execute(endpoint)
        .await
        .expect("endpoint failed")
        .into_iter()
        .map(|call| call.expect("request failed"))
        .collect()
}
