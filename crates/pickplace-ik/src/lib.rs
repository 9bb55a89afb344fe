//! Inverse kinematics for the pick-and-place arm.
//!
//! Provides forward kinematics, geometric Jacobian computation and Damped
//! Least Squares (Levenberg-Marquardt) IK solving for the serial chain
//! described in [`RobotConfig`](pickplace_core::config::RobotConfig), plus a
//! rate-limited [`MotionGenerator`](pickplace_core::traits::MotionGenerator)
//! built on top of them.
//!
//! # Architecture
//!
//! ```text
//! RobotConfig ──► KinematicChain ──► DlsSolver ──► DlsMotionGenerator ──► Action
//! ```

pub mod chain;
pub mod motion;
pub mod solver;

pub use chain::KinematicChain;
pub use motion::DlsMotionGenerator;
pub use solver::{DlsConfig, DlsSolver, IkResult};
