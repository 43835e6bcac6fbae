mod common;
pub use common::*;


#[cfg(any(test, feature = "test-utils"))]
pub use test::*;

#[cfg(not(any(test, feature = "test-utils")))]
mod prod;

#[cfg(not(any(test, feature = "test-utils")))]
pub use prod::*;
