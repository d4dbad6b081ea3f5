//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter: rejects before any database work
//! 2. API key: every route, including health and sign-in
//! 3. Auth validator: session token lookup, injects `AuthContext`
//! 4. Audit logger: logs after auth, has the caller's clinic

pub mod api_key;
pub mod audit;
pub mod auth;
pub mod rate;
