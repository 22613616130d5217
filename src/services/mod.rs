//! Business operations. Each function receives the data-access context (`&dyn Repository`)
//! by parameter and knows nothing about HTTP.

pub mod accounts;
pub mod roles;
