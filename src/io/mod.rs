//! Data ingress/egress: trace and LUT loaders, plus CSV export. All of it
//! runs at component construction or after a run completes; the core loop
//! performs no I/O.

pub mod export;
pub mod lut;
pub mod trace;
