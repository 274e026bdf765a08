//! `panelvis` reads the operating state of an appliance control panel from camera frames.
//!
//! # Structure
//!
//! Frames come from a [capture::FrameSource], are rotated and perspective-corrected by the
//! [normalizer::Normalizer] using four fiducial markers stuck to the panel, then every region of
//! the static [catalog::Catalog] is sampled and classified. The [decoder::PanelDecoder] turns the
//! resulting feature vector into a [panel::PanelState], which is sent out by a [methods::Method].
//! The [daemon::Daemon] runs this cycle periodically.
//!
//! # License
//!
//! This source code is released under the [MIT-License](https://opensource.org/licenses/MIT)

#[macro_use]
extern crate tracing;

pub mod capture;
pub mod catalog;
pub mod classifier;
pub mod daemon;
pub mod decoder;
pub mod geometry;
pub mod image;
pub mod markers;
pub mod methods;
pub mod models;
pub mod normalizer;
pub mod overlay;
pub mod panel;
pub mod pipeline;
pub mod sampler;
pub mod status;

#[cfg(test)]
pub(crate) mod test_utils;
