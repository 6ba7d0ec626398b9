pub mod bus;
pub mod chat;
pub mod config;
pub mod entity;
pub mod error;
pub mod interface;
pub mod storefront;
pub mod transport;
pub mod widget;

#[cfg(test)]
mod test_helpers;
