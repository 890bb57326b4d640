pub mod category;
pub mod product;
pub mod user;

pub use category::*;
pub use product::*;
pub use user::*;
