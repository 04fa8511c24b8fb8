//! Test utilities & fixtures.

use tagforge::titles::{ChannelSink, DisplayUpdate, TitleService};
use tokio::sync::mpsc::UnboundedReceiver;

/// Build a service over a throwaway data dir with a channel sink, so tests
/// can observe every display update the core pushes.
pub fn service_in(
    dir: &std::path::Path,
) -> (TitleService, UnboundedReceiver<DisplayUpdate>) {
    let (sink, rx) = ChannelSink::new();
    let service = TitleService::open(dir, "default", Box::new(sink)).expect("open service");
    (service, rx)
}

/// Drain everything currently buffered in the sink channel.
#[allow(dead_code)] // not every integration file inspects updates
pub fn drain(rx: &mut UnboundedReceiver<DisplayUpdate>) -> Vec<DisplayUpdate> {
    let mut out = Vec::new();
    while let Ok(u) = rx.try_recv() {
        out.push(u);
    }
    out
}
