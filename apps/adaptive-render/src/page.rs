//! Page lifecycle signals: document readiness and tab visibility.
//!
//! Hidden tabs get their animation frames throttled by the browser, so no
//! measurement may start (or count) while the page is hidden.

use async_trait::async_trait;
use tokio::sync::watch;

#[async_trait(?Send)]
pub trait PageSignals {
    /// Resolves once the document has finished parsing.
    async fn wait_ready(&self);

    fn is_visible(&self) -> bool;

    /// Resolves immediately when visible, otherwise on the next
    /// hidden → visible transition.
    async fn wait_until_visible(&self);
}

/// Host-driven lifecycle state built on `watch` channels.
#[derive(Debug)]
pub struct PageState {
    ready: watch::Sender<bool>,
    visible: watch::Sender<bool>,
}

impl PageState {
    pub fn new(ready: bool, visible: bool) -> Self {
        let (ready, _) = watch::channel(ready);
        let (visible, _) = watch::channel(visible);
        Self { ready, visible }
    }

    /// Ready and visible: the common case for an already-loaded page.
    pub fn loaded() -> Self {
        Self::new(true, true)
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }
}

impl Default for PageState {
    fn default() -> Self {
        Self::loaded()
    }
}

#[async_trait(?Send)]
impl PageSignals for PageState {
    async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    async fn wait_until_visible(&self) {
        let mut rx = self.visible.subscribe();
        let _ = rx.wait_for(|visible| *visible).await;
    }
}

#[async_trait(?Send)]
impl<T: PageSignals + ?Sized> PageSignals for std::rc::Rc<T> {
    async fn wait_ready(&self) {
        (**self).wait_ready().await
    }

    fn is_visible(&self) -> bool {
        (**self).is_visible()
    }

    async fn wait_until_visible(&self) {
        (**self).wait_until_visible().await
    }
}
