// UI module - Slint window and event loop bridge
//
// - EventLoopBridge: Marshals updates from background threads onto the Slint event loop
// - GuiController: Wires the window's buttons and progress bar to the RunController

pub mod bridge;
pub mod controller;

pub use bridge::EventLoopBridge;
pub use controller::GuiController;
