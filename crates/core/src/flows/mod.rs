pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, ScenarioFlow};
pub use states::{Resolution, Scenario, ScenarioAction, ScenarioEvent, TransitionOutcome, UnknownScenario};
