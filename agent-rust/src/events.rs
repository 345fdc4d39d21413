use futures::{channel::mpsc, Stream};
use serde::{Deserialize, Serialize};
use std::{
    pin::Pin,
    task::{Context, Poll},
};

/// Receives progress from a run. Implementations must not block.
pub trait RunListener: Send + Sync {
    /// Human-readable progress, e.g. "Calling tool: plan_outfit...".
    fn on_log(&self, _message: &str) {}

    /// Locator of a successfully composed image.
    fn on_image(&self, _locator: &str) {}

    /// Whether anyone is watching for images. The finalize-time composition
    /// only runs when this is true.
    fn receives_images(&self) -> bool {
        true
    }
}

/// The silent listener.
impl RunListener for () {
    fn receives_images(&self) -> bool {
        false
    }
}

type LogFn = Box<dyn Fn(&str) + Send + Sync>;

/// Listener assembled from optional callbacks.
#[derive(Default)]
pub struct CallbackListener {
    on_log: Option<LogFn>,
    on_image: Option<LogFn>,
}

impl CallbackListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_log(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_log = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_image(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_image = Some(Box::new(f));
        self
    }
}

impl RunListener for CallbackListener {
    fn on_log(&self, message: &str) {
        if let Some(f) = &self.on_log {
            f(message);
        }
    }

    fn on_image(&self, locator: &str) {
        if let Some(f) = &self.on_image {
            f(locator);
        }
    }

    fn receives_images(&self) -> bool {
        self.on_image.is_some()
    }
}

/// One event of a streamed run. A stream ends with exactly one `Done` or
/// `Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RunEvent {
    Log {
        message: String,
    },
    Image {
        #[serde(rename = "imageUrl")]
        locator: String,
    },
    Done {
        #[serde(rename = "response")]
        reply: String,
    },
    Error {
        error: String,
    },
}

/// Forwards listener calls into a [`RunStream`].
pub(crate) struct ChannelListener {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelListener {
    pub(crate) fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { sender }
    }

    pub(crate) fn send(&self, event: RunEvent) {
        // The receiver being gone means the consumer stopped listening.
        let _ = self.sender.unbounded_send(event);
    }
}

impl RunListener for ChannelListener {
    fn on_log(&self, message: &str) {
        self.send(RunEvent::Log {
            message: message.to_string(),
        });
    }

    fn on_image(&self, locator: &str) {
        self.send(RunEvent::Image {
            locator: locator.to_string(),
        });
    }
}

/// Events of a run started with `Orchestrator::run_stream`.
pub struct RunStream(mpsc::UnboundedReceiver<RunEvent>);

impl RunStream {
    pub(crate) fn channel() -> (ChannelListener, Self) {
        let (sender, receiver) = mpsc::unbounded();
        (ChannelListener::new(sender), Self(receiver))
    }
}

impl Stream for RunStream {
    type Item = RunEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.0).poll_next(cx)
    }
}
