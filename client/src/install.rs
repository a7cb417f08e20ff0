//! Deferred "install app" prompt offered by the host platform.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// A platform install prompt. It can be shown once.
#[async_trait]
pub trait InstallPrompt: Send + Sync {
    async fn prompt(&self) -> InstallOutcome;
}

/// Holds the deferred prompt between the platform offering it and the user
/// pressing the install button.
#[derive(Default)]
pub struct InstallState {
    prompt: Option<Box<dyn InstallPrompt>>,
    offered: bool,
}

impl InstallState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep the platform's prompt. Only the first offer per client is kept.
    pub fn offer(&mut self, prompt: Box<dyn InstallPrompt>) -> bool {
        if self.offered {
            return false;
        }
        self.offered = true;
        self.prompt = Some(prompt);
        true
    }

    /// The install button is shown while a prompt is held
    pub fn is_available(&self) -> bool {
        self.prompt.is_some()
    }

    /// Remove the prompt for use. It is not returned afterwards whatever the
    /// outcome.
    pub fn take(&mut self) -> Option<Box<dyn InstallPrompt>> {
        self.prompt.take()
    }
}
