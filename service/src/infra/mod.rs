//! Infrastructure layer.

pub mod database;
pub mod notification;
pub mod payment;

#[cfg(test)]
pub use self::database::Memory;
pub use self::{
    database::Database, notification::Dispatcher, payment::Gateway,
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
