//! Master Scheduler - conflict-driven K-12 master schedule engine
//!
//! The engine builds and repairs weekly school schedules around four
//! cooperating subsystems:
//! 1. **Conflict detection**: pure bucket-and-sweep scans that turn a
//!    schedule state into a typed, canonically-ordered conflict list
//! 2. **Fitness scoring**: weighted penalties against a 10000-point
//!    base, with utilisation and load-balance bonuses
//! 3. **Resolution**: per-conflict suggestions validated on a scratch
//!    state, applied by a bounded auto-resolve loop
//! 4. **Assignment**: per-student course selection (prerequisites,
//!    grade progression, medical restrictions), singleton placement,
//!    enrolment balancing, and priority waitlists
//!
//! # Example
//!
//! ```no_run
//! use master_scheduler::parser::load_snapshot_from_dir;
//! use master_scheduler::pipeline::{run_pipeline, PipelineOptions};
//! use master_scheduler::sources::SystemClock;
//! use std::path::Path;
//!
//! let (snapshot, config) = load_snapshot_from_dir(Path::new("./data/demo")).unwrap();
//! let outcome = run_pipeline(&snapshot, &config, &SystemClock, PipelineOptions::default()).unwrap();
//! println!("Score: {:.1}", outcome.fitness.total);
//! ```

pub mod calendar;
pub mod config;
pub mod detector;
pub mod enrollment;
pub mod error;
pub mod fitness;
pub mod parser;
pub mod pipeline;
pub mod placer;
pub mod reporter;
pub mod resolver;
pub mod selector;
pub mod snapshot;
pub mod sources;
pub mod state;
pub mod types;

pub use error::{Result, SchedulerError};
