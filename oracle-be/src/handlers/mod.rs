pub mod health;
pub mod prices;
pub mod update;
