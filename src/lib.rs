//! rezerwacje - appointment slot hunter for the DUW reservation service
//!
//! Watches the calendars of selected offices, queues every free slot it sees
//! and races other visitors for it: lock, captcha, applicant form, confirm.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration files, applicant form rows, entity selection
//! - [`session`] - HTTP transport and the retrying session
//! - [`service`] - Typed calls to the remote endpoints
//! - [`scanner`] - Page extraction, weekday validation, scan loops
//! - [`queue`] - Bounded freshest-first task queue
//! - [`reservation`] - Attempt gate, lock race, reservation executor
//! - [`captcha`] - Captcha solver seam
//! - [`pipeline`] - Discovery, scanners and workers wired together
//! - [`models`] - Core data structures and types
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use rezerwacje::captcha::CommandSolver;
//! use rezerwacje::config::Config;
//! use rezerwacje::pipeline::Pipeline;
//! use rezerwacje::session::{HttpTransport, Session};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(Path::new("application.toml"))?;
//!     let transport = HttpTransport::new(&config.service)?;
//!     let session = Session::new(Arc::new(transport));
//!     let solver = Arc::new(CommandSolver::from_config(&config.captcha));
//!
//!     let pipeline = Pipeline::new(config.pipeline.clone(), session, solver);
//!     let cities = config.select_cities(&[])?;
//!     let active = pipeline.discover(&cities).await?;
//!     // pipeline.run(active, form).await?;
//!     Ok(())
//! }
//! ```

pub mod captcha;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod reservation;
pub mod scanner;
pub mod service;
pub mod session;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::captcha::{CaptchaSolver, CommandSolver};
    pub use crate::config::{Config, UserConfig};
    pub use crate::error::{Error, ErrorCategory, Result, RezerwacjeErrorTrait};
    pub use crate::models::{Entity, EntityKind, FormRow, Task};
    pub use crate::pipeline::{Pipeline, StatsSnapshot};
    pub use crate::queue::TaskQueue;
    pub use crate::reservation::{AttemptGate, AttemptOutcome, LockRace, SuccessPolicy};
    pub use crate::service::RemoteService;
    pub use crate::session::{HttpTransport, RetryPolicy, Session};
}

// Direct re-exports for convenience
pub use models::{Entity, EntityKind, FormRow, Task};
