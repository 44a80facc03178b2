//! Chunk fan-out to multiple stream subscribers.
//!
//! A camera can only be opened once, so all viewers of the same feed share a
//! single [`ChunkStream`][crate::pipeline::ChunkStream]. The [`Broadcaster`]
//! owns that stream: it starts a pipeline worker thread when the first
//! subscriber arrives, relays every chunk to all current subscribers, and
//! tears the pipeline (and with it the camera) down again once the last
//! subscriber is gone.
//!
//! Subscriber channels are bounded to a single chunk. Nothing is buffered
//! ahead of what a transport is ready to write, and a subscriber that cannot
//! keep up skips frames instead of delaying everyone else.

use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use crate::pipeline::ChunkStream;
use crate::stream::StreamChunk;

type StreamFactory = Box<dyn FnMut() -> Box<dyn ChunkStream> + Send>;

/// Fans chunks from a shared pipeline out to any number of subscribers.
pub struct Broadcaster {
    state: Mutex<SharedState>,
}

struct SharedState {
    subscribers: Vec<Sender<Arc<StreamChunk>>>,
    /// Whether a pipeline worker is currently alive.
    running: bool,
    factory: StreamFactory,
}

impl Broadcaster {
    /// Creates a broadcaster.
    ///
    /// `factory` is called to build a fresh pipeline whenever a subscriber
    /// arrives while no pipeline is running: on first subscription, and again
    /// after a previous pipeline ended (its end-of-stream or error is not
    /// inherited by future subscribers).
    pub fn new(factory: impl FnMut() -> Box<dyn ChunkStream> + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SharedState {
                subscribers: Vec::new(),
                running: false,
                factory: Box::new(factory),
            }),
        })
    }

    /// Registers a new subscriber, starting the pipeline worker if none is
    /// running.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (sender, recv) = bounded(1);

        let mut state = self.state.lock().unwrap();
        state.subscribers.push(sender);
        if !state.running {
            state.running = true;
            let stream = (state.factory)();
            let this = self.clone();
            thread::Builder::new()
                .name("frame pipeline".into())
                .spawn(move || this.run(stream))
                .unwrap();
        }

        Subscription { recv }
    }

    fn run(&self, mut stream: Box<dyn ChunkStream>) {
        loop {
            let chunk = match stream.next_chunk() {
                Ok(Some(chunk)) => Arc::new(chunk),
                Ok(None) => {
                    log::info!("stream ended");
                    break;
                }
                Err(e) => {
                    log::error!("pipeline error, ending stream: {}", e);
                    break;
                }
            };

            let mut state = self.state.lock().unwrap();
            state.subscribers.retain(|sub| match sub.try_send(chunk.clone()) {
                Ok(()) => true,
                // Still writing the previous chunk; skip this one for them.
                Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
            if state.subscribers.is_empty() {
                log::info!("last subscriber left, shutting down pipeline");
                state.running = false;
                return;
            }
        }

        // The pipeline ended on its own. Disconnect the remaining
        // subscribers so their transports terminate too.
        let mut state = self.state.lock().unwrap();
        state.subscribers.clear();
        state.running = false;
    }
}

/// A subscription to a [`Broadcaster`], yielding chunks as they are produced.
///
/// The iterator ends when the pipeline terminates. Dropping the subscription
/// cancels it; the broadcaster notices at the next chunk.
pub struct Subscription {
    recv: Receiver<Arc<StreamChunk>>,
}

impl Iterator for Subscription {
    type Item = Arc<StreamChunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use crate::image::Image;
    use crate::stream;

    use super::*;

    /// Yields a fixed number of chunks, then ends.
    struct CountedStream {
        remaining: u32,
    }

    impl ChunkStream for CountedStream {
        fn next_chunk(&mut self) -> anyhow::Result<Option<StreamChunk>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            stream::encode(&Image::new(8, 8)).map(Some)
        }
    }

    #[test]
    fn subscriber_sees_chunks_until_stream_ends() {
        let broadcaster = Broadcaster::new(|| Box::new(CountedStream { remaining: 3 }));
        let count = broadcaster.subscribe().count();
        // The bounded(1) channel may drop chunks under scheduling pressure,
        // but at least one must arrive, and the subscription must terminate.
        assert!((1..=3).contains(&count));
    }

    #[test]
    fn new_subscriber_restarts_ended_pipeline() {
        let broadcaster = Broadcaster::new(|| Box::new(CountedStream { remaining: 1 }));
        assert!(broadcaster.subscribe().count() >= 1);
        assert!(broadcaster.subscribe().count() >= 1);
    }
}
