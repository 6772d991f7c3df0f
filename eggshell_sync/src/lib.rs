// eggshell_sync — the client-side synchronization channel.
//
// `SyncChannel` is the piece that keeps one participant's `CanvasStore`
// consistent with everyone else's: it owns the store and a `NetClient`,
// applies the relay's `Init` snapshot on connect, forwards local paints
// exactly once, and applies remote paints as they arrive.
//
// The channel is deliberately dumb about failure: when the connection drops
// it transitions to `Disconnected` and keeps painting locally. Nothing is
// queued for later delivery and no reconnect is attempted here — retry
// policy (backoff, user prompt, whatever) belongs to the embedding
// application, which can simply call `connect` again.

pub mod channel;

pub use channel::{ChannelState, SyncChannel, default_relay_addr};
