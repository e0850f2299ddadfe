//! Domain services
//!
//! - `period` / `range_count`: window validation and record counts
//! - `rows` / `predictor`: the predictor backend and other row sources
//! - `simulation` / `session`: the paced replay pipeline

pub mod period;
pub mod range_count;
pub mod predictor;
pub mod rows;
pub mod simulation;
pub mod session;

pub use predictor::{PredictorClient, PredictorError};
pub use rows::RowSource;
pub use session::SimulationSession;
pub use simulation::{SimulationController, SimulationEvent, SimulationState};
