// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod cache_validator {
    pub use crate::cache_validator::*;
}
