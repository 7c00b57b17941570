use groundcover_common::SimulationError;

/// Errors surfaced by a coverage tick.
///
/// Geometry problems never show up here: empty rectangles are no-ops and a
/// target that jumps away triggers a reset. Only the simulation refusing a
/// request is reported.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoverageError {
    #[error("simulation error: {0}")]
    Simulation(#[from] SimulationError),
}
