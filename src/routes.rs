mod health_check;
mod newsletters;

pub use health_check::*;
pub use newsletters::*;
