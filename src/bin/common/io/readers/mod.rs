pub mod asc;
pub mod locator;
pub mod prelude;
