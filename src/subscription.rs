//! Reference-counted listener lifetime for shared realtime channels.
//!
//! Several screens may want the same realtime feed (marker changes, auth
//! state). The channel is attached when the first consumer acquires it and
//! detached when the last guard is dropped.

use std::sync::{Arc, Mutex};

use log::{debug, warn};

/// Side effects run at the edges of a channel's lifetime.
pub trait ChannelHooks: Send + Sync {
    /// Called when the consumer count goes from 0 to 1.
    fn attach(&self);
    /// Called when the consumer count goes from 1 to 0.
    fn detach(&self);
}

struct ChannelState<H: ChannelHooks> {
    name: String,
    hooks: H,
    consumers: Mutex<usize>,
}

impl<H: ChannelHooks> ChannelState<H> {
    fn release(&self) {
        let Ok(mut consumers) = self.consumers.lock() else {
            warn!("[SharedChannel] {} lock poisoned on release", self.name);
            return;
        };
        match *consumers {
            0 => warn!("[SharedChannel] {} released with no consumers", self.name),
            1 => {
                *consumers = 0;
                self.hooks.detach();
                debug!("[SharedChannel] {} detached", self.name);
            }
            n => *consumers = n - 1,
        }
    }
}

/// A channel shared by any number of consumers.
pub struct SharedChannel<H: ChannelHooks> {
    state: Arc<ChannelState<H>>,
}

impl<H: ChannelHooks> Clone for SharedChannel<H> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<H: ChannelHooks + 'static> SharedChannel<H> {
    pub fn new(name: impl Into<String>, hooks: H) -> Self {
        Self {
            state: Arc::new(ChannelState {
                name: name.into(),
                hooks,
                consumers: Mutex::new(0),
            }),
        }
    }

    /// Register a consumer. The channel stays attached while the guard lives.
    pub fn acquire(&self) -> ChannelGuard {
        match self.state.consumers.lock() {
            Ok(mut consumers) => {
                if *consumers == 0 {
                    self.state.hooks.attach();
                    debug!("[SharedChannel] {} attached", self.state.name);
                }
                *consumers += 1;
            }
            Err(_) => {
                warn!("[SharedChannel] {} lock poisoned on acquire", self.state.name);
                return ChannelGuard { release: None };
            }
        }

        let state = Arc::clone(&self.state);
        ChannelGuard {
            release: Some(Box::new(move || state.release())),
        }
    }

    pub fn consumer_count(&self) -> usize {
        self.state.consumers.lock().map(|c| *c).unwrap_or(0)
    }

    pub fn is_attached(&self) -> bool {
        self.consumer_count() > 0
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }
}

/// Keeps one consumer registered until dropped.
pub struct ChannelGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ChannelGuard {
    /// Release now instead of at drop time.
    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}
