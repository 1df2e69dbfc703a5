//! Upstream build orchestration.
//!
//! A configuration is translated into a [`BuildPlan`] (arguments plus an
//! environment overlay) for one of four strategies, and a [`BuildBackend`]
//! runs the plan through a [`CommandRunner`](crate::util::process::CommandRunner).

pub mod autotools;
pub mod backend;
pub mod cmake;
pub mod context;
pub mod env;
pub mod invoker;
pub mod patch;
pub mod plan;
pub mod strategy;
pub mod winbuild;

pub use backend::{backend_for, BuildBackend};
pub use context::BuildContext;
pub use env::BuildEnv;
pub use invoker::invoke;
pub use plan::{BuildPlan, OptionFlag};
pub use strategy::BuildStrategy;
