pub mod customer;
pub mod entities;
pub mod invoice;
pub mod quotation;
pub mod tax;

// Re-export tracing for use in this crate
pub use tracing;

/// Installs the default `fmt` subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise from `default_filter`.
/// Calling it twice is harmless: the second call is ignored.
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
