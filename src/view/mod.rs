//! Presentation layer: draw ops, summary widgets, the view state machine and
//! the static document adapter.

pub mod controller;
pub mod document;
pub mod ops;
pub mod widgets;

pub use controller::{DashboardPhase, ViewController, ViewState};
pub use document::Document;
pub use ops::{DrawOp, Page, Target};
