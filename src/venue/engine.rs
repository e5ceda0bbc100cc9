//! Generic reconnect loop shared by every venue.
//!
//! Repeatedly: dial the venue's WS URL; on success, send chunked
//! subscription frames; then read messages until the connection fails or a
//! parse error bubbles up; on failure, log, sleep 3 s, and retry. There is
//! no exponential backoff and no connection budget, unlike
//! `mempool::monitor`'s `MAX_RECONNECTS` cap — the loop is infinite by
//! design so transient outages self-heal.

use crate::cache::QuoteCache;
use crate::types::Instrument;
use crate::venue::{KeepalivePolicy, VenueClient};
use futures_util::{Sink, SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(3);
const INTER_CHUNK_SLEEP: Duration = Duration::from_millis(200);

/// Runs forever. Intended to be `tokio::spawn`ed once per venue.
pub async fn run_reconnect_loop(
    client: Arc<dyn VenueClient>,
    instruments: Vec<Instrument>,
    cache: QuoteCache,
) {
    let venue = client.venue();
    loop {
        info!(%venue, "connecting");
        match run_session(&*client, &instruments, &cache).await {
            Ok(()) => {
                // A clean return means the socket closed without error —
                // still treated as a transient outage, not a final exit.
                warn!(%venue, "session ended, reconnecting");
            }
            Err(e) => {
                error!(%venue, error = %e, "session failed, reconnecting");
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn run_session(
    client: &dyn VenueClient,
    instruments: &[Instrument],
    cache: &QuoteCache,
) -> anyhow::Result<()> {
    let venue = client.venue();
    let (ws_stream, _) = tokio_tungstenite::connect_async(client.ws_url()).await?;
    let (mut write, mut read) = ws_stream.split();

    for chunk in instruments.chunks(client.chunk_size()) {
        for frame in client.build_subscriptions(chunk) {
            write.send(frame).await?;
        }
        tokio::time::sleep(INTER_CHUNK_SLEEP).await;
    }

    if let KeepalivePolicy::Interval { period } = client.keepalive() {
        let frame = client
            .keepalive_frame()
            .expect("venue declares Interval keepalive but no keepalive_frame");
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    write.send(frame.clone()).await?;
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) => dispatch(client, &venue, cache, &mut write, msg).await?,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    }
                }
            }
        }
    } else {
        while let Some(msg) = read.next().await {
            let msg = msg?;
            dispatch(client, &venue, cache, &mut write, msg).await?;
        }
        Ok(())
    }
}

async fn dispatch(
    client: &dyn VenueClient,
    venue: &crate::types::VenueId,
    cache: &QuoteCache,
    write: &mut (impl Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin),
    msg: Message,
) -> anyhow::Result<()> {
    if let Some(reply) = client.ping_reply(&msg) {
        write.send(reply).await?;
        return Ok(());
    }

    match client.handle_frame(&msg) {
        Some((instrument_key, delta)) => {
            cache.update(*venue, &instrument_key, delta);
        }
        None => {
            debug!(%venue, "dropped unrecognized or unparsable frame");
        }
    }
    Ok(())
}
