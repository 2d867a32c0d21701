//! This file is the root of the `csx_core` crate.
//!
//! csx-core compresses a sparse matrix into CSX, a substructure-aware binary
//! representation: an analyzer detects repeating geometric runs (horizontal,
//! vertical, diagonal, anti-diagonal and block shapes), an encoder rewrites
//! the matrix around them, and an assembler emits a byte-packed control
//! stream plus a values array that a runtime kernel can decode in one
//! forward sweep.
//!
//! The crate is organised bottom-up:
//! 1. `kernels`: pure, stateless codecs (delta/RLE, LEB128 varints,
//!    fixed-width packing).
//! 2. `encoding`: iteration orders, pattern descriptors and the pattern-id
//!    algebra.
//! 3. `matrix`: the owned, transformable sparse partition.
//! 4. `pipeline`: statistics, the per-order encoder and the planning loop.
//! 5. `csx`: the control-stream builder, the CSX assembler and the
//!    reference decoder.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod config;
pub mod csx;
pub mod encoding;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod pipeline;

pub use config::EncoderConfig;
pub use csx::matrix::{CsxMatrix, CsxSymMatrix, RowInfo};
pub use error::CsxError;
pub use matrix::partition::SparsePartition;
