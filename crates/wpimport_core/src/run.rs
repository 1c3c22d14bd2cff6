/// What to do after an item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPolicy {
    /// Stop at the first failed item.
    #[default]
    AbortOnError,
    /// Log the failure and move on to the next item.
    ContinueOnError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Created { title: String },
    /// Title already present in the destination store.
    Skipped { title: String },
    Failed {
        title: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
    pub halted: bool,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.created + self.skipped + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    policy: RunPolicy,
    summary: RunSummary,
}

impl RunState {
    pub fn new(policy: RunPolicy, total: usize) -> Self {
        Self {
            policy,
            summary: RunSummary {
                total,
                ..RunSummary::default()
            },
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    pub fn is_halted(&self) -> bool {
        self.summary.halted
    }
}

/// Pure update function: records an item outcome and decides whether the run goes on.
///
/// Once halted, further outcomes are ignored.
pub fn update(mut state: RunState, outcome: ItemOutcome) -> (RunState, Step) {
    if state.summary.halted {
        return (state, Step::Halt);
    }

    let step = match outcome {
        ItemOutcome::Created { .. } => {
            state.summary.created += 1;
            Step::Continue
        }
        ItemOutcome::Skipped { .. } => {
            state.summary.skipped += 1;
            Step::Continue
        }
        ItemOutcome::Failed { .. } => {
            state.summary.failed += 1;
            match state.policy {
                RunPolicy::AbortOnError => {
                    state.summary.halted = true;
                    Step::Halt
                }
                RunPolicy::ContinueOnError => Step::Continue,
            }
        }
    };

    (state, step)
}
