use tracing_subscriber::EnvFilter;

// RUST_LOG controls the filter (default info); LOG_FORMAT=json switches to
// line-delimited JSON for log shippers.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_output = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json_output {
        builder.json().init();
    } else {
        builder.init();
    }
}
