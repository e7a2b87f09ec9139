use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPrompt<A> {
    pub title: String,
    pub message: String,
    pub requires_input: bool,
    pub on_confirm: A,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome<A> {
    /// The prompt was closed; the caller must now run `action`.
    Confirmed { action: A, input: Option<String> },
    /// Input was required but blank; the prompt is still open.
    StillOpen,
    NothingOpen,
}

/// Single-slot prompt holder.
///
/// `confirm` empties the slot before handing the action back, so whatever
/// the action does next (including opening another prompt) starts from a
/// closed workflow.
#[derive(Debug, Clone)]
pub struct PromptWorkflow<A> {
    slot: Option<PendingPrompt<A>>,
}

impl<A> Default for PromptWorkflow<A> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<A> PromptWorkflow<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        requires_input: bool,
        on_confirm: A,
    ) {
        let title = title.into();
        if let Some(replaced) = &self.slot {
            debug!(replaced = %replaced.title, opened = %title, "prompt replaced");
        } else {
            debug!(opened = %title, "prompt opened");
        }
        self.slot = Some(PendingPrompt {
            title,
            message: message.into(),
            requires_input,
            on_confirm,
        });
    }

    pub fn confirm(&mut self, input: &str) -> ConfirmOutcome<A> {
        let Some(prompt) = self.slot.as_ref() else {
            return ConfirmOutcome::NothingOpen;
        };
        if prompt.requires_input && input.trim().is_empty() {
            return ConfirmOutcome::StillOpen;
        }

        let Some(prompt) = self.slot.take() else {
            return ConfirmOutcome::NothingOpen;
        };
        debug!(title = %prompt.title, "prompt confirmed");
        let input = prompt.requires_input.then(|| input.to_string());
        ConfirmOutcome::Confirmed {
            action: prompt.on_confirm,
            input,
        }
    }

    pub fn cancel(&mut self) -> bool {
        let closed = self.slot.take();
        if let Some(prompt) = &closed {
            debug!(title = %prompt.title, "prompt cancelled");
        }
        closed.is_some()
    }

    #[must_use]
    pub fn current(&self) -> Option<&PendingPrompt<A>> {
        self.slot.as_ref()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.slot.is_some()
    }
}
