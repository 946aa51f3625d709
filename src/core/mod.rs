// Domain-layer modules and shared errors/models
pub mod name_parser {
    pub use crate::name_parser::*;
}

pub mod detector {
    pub use crate::detector::*;
}

pub mod merger {
    pub use crate::merger::*;
}

pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
