//! Ordered pipeline steps and the advancement policy.
//!
//! Progress is announced by step *index*, not by per-step completion
//! events: the arrival of an event naming step `k` implies every step
//! strictly below `k` has finished.
//! [`StepRegistry::apply_advancement`] encodes that rule.

/// Ordinal of the payment-gate step in the conversion pipeline.
///
/// The backend announces this index when an export crosses the free
/// tier. Reaching it marks the gate step done -- its role is to signal,
/// not to block rendering of the remaining steps.
pub const PAYMENT_REQUIRED: usize = 2;

/// Semantic name of the payment-gate step.
pub const PAYMENT_REQUIRED_STEP: &str = "Payment Required";

/// One named pipeline step with its completion flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Stable semantic name used for lookups.
    pub name: &'static str,
    /// Human-readable label for display.
    pub label: &'static str,
    /// Whether the pipeline has finished this step.
    pub done: bool,
}

impl Step {
    fn new(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            done: false,
        }
    }
}

/// The steps of the conversion pipeline, in execution order.
///
/// Index [`PAYMENT_REQUIRED`] is the payment gate: the export size is
/// known once messages are parsed, so the gate sits before any media or
/// rendering work is spent on a paywalled export.
pub fn conversion_steps() -> Vec<Step> {
    vec![
        Step::new("Upload", "Uploading chat export"),
        Step::new("Parse Messages", "Parsing messages"),
        Step::new(PAYMENT_REQUIRED_STEP, "Checking export size"),
        Step::new("Prepare Media", "Preparing media"),
        Step::new("Render Document", "Rendering document"),
    ]
}

/// Fixed, ordered collection of steps for one session.
///
/// The ordering is established at session creation and never changes;
/// the only mutation is flipping `done` flags, and every mutation here
/// is idempotent.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    /// Registry for the production conversion pipeline.
    pub fn for_conversion() -> Self {
        Self::new(conversion_steps())
    }

    /// Build a registry from an explicit step list.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// All steps, in pipeline order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps in the pipeline.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Mark a single step done.
    ///
    /// Idempotent; out-of-range indices are ignored.
    pub fn mark_done(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            step.done = true;
        }
    }

    /// Apply the advancement policy for an announced step index.
    ///
    /// Every step strictly below `step_index` is marked done; the step
    /// at `step_index` itself stays active (not done) until a later
    /// event moves past it. An index at or past the end completes all
    /// steps and designates no active step.
    pub fn apply_advancement(&mut self, step_index: usize) {
        let upto = step_index.min(self.steps.len());
        for step in &mut self.steps[..upto] {
            step.done = true;
        }
    }

    /// Force-complete every step. Used on confirmed success only.
    pub fn mark_all_done(&mut self) {
        for step in &mut self.steps {
            step.done = true;
        }
    }

    /// Mark the step with the given semantic name done, if present.
    pub fn mark_done_by_name(&mut self, name: &str) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.name == name) {
            step.done = true;
        }
    }

    /// Whether the step with the given semantic name is done.
    ///
    /// `false` when no such step exists.
    pub fn is_done_by_name(&self, name: &str) -> bool {
        self.steps.iter().any(|s| s.name == name && s.done)
    }

    /// Whether every step is done.
    pub fn all_done(&self) -> bool {
        self.steps.iter().all(|s| s.done)
    }
}
