pub mod cache;
pub mod configure;
pub mod helpers;
pub mod portfolio;
pub mod price;
pub mod sync;
pub mod tokens;
pub mod wallet;
