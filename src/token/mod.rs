pub mod jwt;
pub mod minter;
pub mod secret;
