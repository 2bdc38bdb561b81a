//! Operations the panel UI invokes. Each maps its failure to a [`PanelError`](crate::error::PanelError).

pub mod display;
