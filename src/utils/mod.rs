pub mod codes;
pub mod jwt;
pub mod money;
