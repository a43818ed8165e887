//! Snapshot export of a rendered canvas.
//!
//! The only backend is [`svg::SvgSurface`], an in-memory [`HostSurface`]
//! that records every placement a session makes and serializes the final
//! state to an SVG document.
//!
//! [`HostSurface`]: crate::host::HostSurface

pub mod svg;
