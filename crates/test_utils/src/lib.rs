#![deny(missing_docs)]
//! Test utilities for guildfetch crates.

#[doc(hidden)]
pub use tokio;

pub mod guild;
pub mod id;
pub mod member;

/// Enable tracing with the RUST_LOG environment variable.
///
/// This is intended to be used in tests, so it defaults to DEBUG level.
pub fn enable_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::DEBUG.into())
                .from_env_lossy(),
        )
        .try_init();
}

/// Run a block repeatedly until it `break`s, sleeping between attempts.
/// Panics if the block has not broken out before the timeout.
///
/// ```ignore
/// iter_check!(1000, 10, {
///     if done() {
///         break;
///     }
/// });
/// ```
///
/// The timeout defaults to 1000ms and the sleep to 10ms.
#[macro_export]
macro_rules! iter_check {
    ($timeout_ms:expr, $sleep_ms:expr, $code:block) => {
        $crate::tokio::time::timeout(
            std::time::Duration::from_millis($timeout_ms),
            async {
                loop {
                    $code
                    $crate::tokio::time::sleep(
                        std::time::Duration::from_millis($sleep_ms),
                    )
                    .await;
                }
            },
        )
        .await
        .expect("iter_check timed out");
    };
    ($timeout_ms:expr, $code:block) => {
        $crate::iter_check!($timeout_ms, 10, $code)
    };
    ($code:block) => {
        $crate::iter_check!(1000, 10, $code)
    };
}
