/// Install the default tracing subscriber. Embedding applications that
/// bring their own subscriber can skip this.
pub fn init() {
    init_with_filter("playhead=debug");
}

pub fn init_with_filter(filter: &str) {
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
