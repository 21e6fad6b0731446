#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// #![warn(clippy::cargo)]

pub mod config;
pub mod correction;
pub mod dataset;
pub mod error;
pub mod gravimetric;
pub mod instrument;
pub mod linfit;
pub mod math;
pub mod series;

pub use error::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
