mod fixtures;

mod batch;
mod calls;
mod events;
mod lifecycle;
