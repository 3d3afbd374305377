//! Fire-and-forget audio triggers.
//!
//! The render loop only ever asks for a clip to start; it never waits for
//! playback and never sees playback errors beyond a log line.

use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::{audio_error, ViewerResult};

/// Clips the viewer knows how to request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipId {
    Thunder,
}

impl ClipId {
    pub fn name(&self) -> &'static str {
        match self {
            ClipId::Thunder => "thunder",
        }
    }
}

/// Non-blocking audio capability
pub trait AudioTrigger {
    fn play_async(&mut self, clip: ClipId) -> ViewerResult<()>;
}

/// Sink that only logs requests; used when no audio device is wired in
#[derive(Debug, Default)]
pub struct LoggingAudio {
    played: usize,
}

impl LoggingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> usize {
        self.played
    }
}

impl AudioTrigger for LoggingAudio {
    fn play_async(&mut self, clip: ClipId) -> ViewerResult<()> {
        self.played += 1;
        log::info!("[LoggingAudio::play_async] {} clip requested", clip.name());
        Ok(())
    }
}

/// Hands clip requests to a background thread over a bounded channel.
///
/// `play_async` uses `try_send`, so a full queue or a dead worker turns into
/// an error instead of stalling the frame.
pub struct AudioDispatcher {
    sender: Option<Sender<ClipId>>,
    worker: Option<JoinHandle<()>>,
}

impl AudioDispatcher {
    /// Spawn the worker. `player` runs on the worker thread for every clip.
    pub fn spawn<F>(queue_depth: usize, mut player: F) -> ViewerResult<Self>
    where
        F: FnMut(ClipId) + Send + 'static,
    {
        let (sender, receiver): (Sender<ClipId>, Receiver<ClipId>) = bounded(queue_depth.max(1));
        let worker = std::thread::Builder::new()
            .name("audio-dispatch".to_string())
            .spawn(move || {
                for clip in receiver.iter() {
                    player(clip);
                }
                log::debug!("[AudioDispatcher] Worker exiting");
            })
            .map_err(|e| audio_error("dispatcher", e))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Dispatcher whose worker just logs each clip
    pub fn logging() -> ViewerResult<Self> {
        Self::spawn(4, |clip| {
            log::info!("[AudioDispatcher] Playing {} clip", clip.name());
        })
    }
}

impl AudioTrigger for AudioDispatcher {
    fn play_async(&mut self, clip: ClipId) -> ViewerResult<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| audio_error(clip.name(), "dispatcher shut down"))?;
        sender.try_send(clip).map_err(|e| match e {
            TrySendError::Full(_) => audio_error(clip.name(), "queue full"),
            TrySendError::Disconnected(_) => audio_error(clip.name(), "worker stopped"),
        })
    }
}

impl Drop for AudioDispatcher {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("[AudioDispatcher::drop] Audio worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_logging_audio_counts() {
        let mut audio = LoggingAudio::new();
        audio.play_async(ClipId::Thunder).unwrap();
        assert_eq!(audio.played(), 1);
    }

    #[test]
    fn test_dispatcher_delivers_clips() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let mut dispatcher = AudioDispatcher::spawn(8, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        dispatcher.play_async(ClipId::Thunder).unwrap();
        dispatcher.play_async(ClipId::Thunder).unwrap();
        drop(dispatcher);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_full_queue_reports_error() {
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let mut dispatcher = AudioDispatcher::spawn(1, move |_| {
            let _ = gate_rx.recv();
        })
        .unwrap();

        // First clip is taken by the blocked worker or sits in the queue;
        // keep pushing until the bounded queue rejects one.
        let mut rejected = false;
        for _ in 0..4 {
            if dispatcher.play_async(ClipId::Thunder).is_err() {
                rejected = true;
                break;
            }
        }
        assert!(rejected);
        drop(gate_tx);
    }
}
