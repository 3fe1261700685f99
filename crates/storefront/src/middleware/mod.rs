//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with a `request_id` field)
//! 3. Request ID (read or generate `x-request-id`, record it in the span)
//! 4. Security headers
//! 5. CORS
//! 6. Rate limiting on `/api` (governor)

pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use rate_limit::{api_rate_limiter, wishlist_rate_limiter};
pub use request_id::{make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
