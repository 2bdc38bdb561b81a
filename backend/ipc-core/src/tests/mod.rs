mod affinity;
mod batch_wire;
mod config;
mod contract;
mod local_event;
mod observer;
mod registry;
mod subscribers;
