//! Frameflow core - node graph plumbing for real-time video analysis
//!
//! This crate provides the generic contract every processing node honours so
//! it can be composed into a concurrent pipeline graph: ports and their
//! locking discipline, the lifecycle state machine, typed parameters, the
//! node-kind registry, and a minimal tick scheduler. The processing nodes
//! themselves live in sibling crates (`frameflow-motion-history`,
//! `frameflow-motion-energy`, `frameflow-distance-field`,
//! `frameflow-video-source`).

pub mod node;
pub mod params;
pub mod pipeline;
pub mod port;
pub mod registry;

pub use node::{LifecycleState, MaxTicks, Node, NodeDriver};
pub use params::{ParamDependency, ParamSet, ParamSpec, ParamValue};
pub use pipeline::{Pipeline, TickPolicy, TickReport};
pub use port::{BufferSlot, InputGuard, InputPort, OutputGuard, OutputPort};
pub use registry::{NodeFactory, NodeManifest, PortDecl, Registry, RegistryError};
