//! Session-based resolution of the acting account. Credentials are checked
//! by the login flow elsewhere; everything under `/admin` only needs to know
//! *which* owner is logged in.

mod middleware;

pub use middleware::*;
