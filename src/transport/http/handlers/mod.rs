pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod tickets;
pub mod wallet;
