//! Common types shared among all event store crates

#[cfg(any(test, feature = "test-utils"))]
pub use test::*;

pub mod retry;
pub use retry::*;

pub mod time;

#[cfg(test)]
pub(crate) mod tests {
    // Execute once before any tests are run
    #[ctor::ctor]
    fn _setup() {
        crate::test::logger();
    }
}
