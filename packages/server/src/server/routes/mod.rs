// HTTP routes
pub mod generate;
pub mod health;
pub mod sites;

pub use generate::*;
pub use health::*;
pub use sites::*;
