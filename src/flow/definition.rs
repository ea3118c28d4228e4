//! Flow definitions: the ordered list of steps a flow walks through.

use crate::domain::DomainContext;
use crate::errors::FlowError;
use crate::flow::model::FlowStepType;

/// One step of a flow: which kind it is and the prompt it asks with.
///
/// Immutable once the definition is built. The prompt is a template; the
/// `{venue}` placeholder is substituted from the flow's domain context when
/// the step renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStepDescriptor {
    pub step: FlowStepType,
    pub prompt: String,
}

impl FlowStepDescriptor {
    pub fn new(step: FlowStepType, prompt: impl Into<String>) -> Self {
        Self {
            step,
            prompt: prompt.into(),
        }
    }

    /// Render the prompt template against a domain context
    pub fn render_prompt(&self, context: &DomainContext) -> String {
        self.prompt.replace("{venue}", &context.venue)
    }
}

/// An ordered sequence of steps leading to one completed record.
///
/// Step order lives here and only here; handlers and selections never assume
/// an order of their own. Definitions are validated at construction: at least
/// one step, and no step type twice (selections are keyed by step type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDefinition {
    steps: Vec<FlowStepDescriptor>,
}

impl FlowDefinition {
    pub fn new(steps: Vec<FlowStepDescriptor>) -> Result<Self, FlowError> {
        if steps.is_empty() {
            return Err(FlowError::Invariant(
                "flow definition must contain at least one step".to_string(),
            ));
        }
        for (index, descriptor) in steps.iter().enumerate() {
            if steps[..index].iter().any(|d| d.step == descriptor.step) {
                return Err(FlowError::Invariant(format!(
                    "duplicate step type {} in flow definition",
                    descriptor.step
                )));
            }
        }
        Ok(Self { steps })
    }

    /// The standard restaurant reservation flow
    pub fn reservation() -> Self {
        Self::new(vec![
            FlowStepDescriptor::new(
                FlowStepType::Date,
                "📅 When would you like to dine at {venue}?\nPick a date below or type one as yyyy-mm-dd.",
            ),
            FlowStepDescriptor::new(FlowStepType::Area, "🪑 Where at {venue} would you like to sit?"),
            FlowStepDescriptor::new(FlowStepType::Time, "🕐 What time should we expect you?"),
            FlowStepDescriptor::new(
                FlowStepType::PartySize,
                "👥 How many guests? Type a number.",
            ),
            FlowStepDescriptor::new(
                FlowStepType::Confirm,
                "Please review your reservation at {venue}.",
            ),
        ])
        .expect("reservation preset is a valid definition")
    }

    /// Number of steps in the flow
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The descriptor at a given position, if the position is in range
    pub fn step_at(&self, index: usize) -> Option<&FlowStepDescriptor> {
        self.steps.get(index)
    }

    /// Step types in flow order
    pub fn step_types(&self) -> impl Iterator<Item = FlowStepType> + '_ {
        self.steps.iter().map(|descriptor| descriptor.step)
    }
}
