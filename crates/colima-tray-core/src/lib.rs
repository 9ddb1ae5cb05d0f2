//! Colima Tray Core Library
//!
//! Status reconciliation and command dispatch for a Colima VM and the
//! containers running inside it. Everything here is toolkit-agnostic: the
//! menu side only sees [`PresentationUpdate`]s delivered to a
//! [`PresentationSink`].
//!
//! # Example
//!
//! ```no_run
//! use colima_tray_core::{
//!     Action, PresentationSink, PresentationUpdate, Supervisor, SupervisorSettings,
//!     SystemInvoker, Toolchain,
//! };
//!
//! use std::sync::Arc;
//!
//! struct LogSink;
//!
//! impl PresentationSink for LogSink {
//!     fn publish(&self, update: PresentationUpdate) {
//!         println!("{update:?}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut supervisor = Supervisor::new(
//!         Arc::new(SystemInvoker),
//!         Arc::new(Toolchain::default()),
//!         Arc::new(LogSink),
//!         SupervisorSettings::default(),
//!     );
//!
//!     supervisor.spawn_vm();
//!     let _ = supervisor.enumerate().await;
//!     let _ = supervisor.dispatch_vm(Action::Start);
//!
//!     supervisor.shutdown().await;
//! }
//! ```

mod aggregate;
mod controller;
mod entity;
mod error;
mod inventory;
mod invoker;
mod presentation;
pub mod status;
mod supervisor;
mod toolchain;

pub use {
    aggregate::AggregateController,
    controller::{ActionRequest, ControllerContext, EntityController, EntityHandle},
    entity::{Action, EntityId, EntityKind, Phase},
    error::{CoreError, Result as CoreResult},
    inventory::{ContainerRecord, DEFAULT_PROJECT, Inventory, build_inventory, enumerate},
    invoker::{CommandLine, Invocation, ProcessInvoker, SystemInvoker},
    presentation::{
        EntityControls, EntityView, FailureNotice, MemberLayout, PresentationSink,
        PresentationUpdate, ProjectLayout, ProjectView,
    },
    status::{Status, parse_entity_status, parse_runtime_status},
    supervisor::{ReconcileSummary, Supervisor, SupervisorSettings},
    toolchain::{TerminalLauncher, Toolchain},
};

#[cfg(test)]
mod tests;
