pub mod cors;
pub mod identity;
pub mod response;

pub use cors::cors_middleware;
pub use identity::{bearer_token, identity_middleware, Caller};
pub use response::{ApiResponse, ApiResult};
