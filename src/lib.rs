//! GX3D exporter
//!
//! The serialization engine lives in `gx3d_core` and the scene walker in
//! `gx3d_scene`; this crate adds layered configuration for the command line tool.

pub mod config;
