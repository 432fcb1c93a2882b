//! Guided tours: per-page step walkthroughs, gated on stored progress.
//!
//! A page mounts a `TourEngine` with its steps. The engine waits for the
//! session's progress load, decides once whether to run, filters steps to the
//! targets present on the page, and records completion or skip in the
//! `ProgressStore` when the tour ends.

pub mod engine;
pub mod guardian;
pub mod resolver;
pub mod state;
pub mod step;

pub use engine::{ConsentAction, RenderView, TourEngine, TourEvent, TourEventKind, TourOptions};
pub use guardian::{CaptureRegistry, ClickGuardian, GuardHandle, PointerHost};
pub use resolver::{StaticTargets, TargetResolver};
pub use state::{TourEngineState, TourOutcome, TourPhase};
pub use step::{ConsentPrompt, Placement, Step};
