//! Marshaling runtime shared by every generated binding
//!
//! Generated wrappers are thin: they name an [`AlgorithmSpec`] and delegate
//! to [`NativeAlgorithm`], which owns the native handle, pushes parameters,
//! validates inputs and reshapes outputs.

mod algorithm;
pub mod audio;
pub mod context;
pub mod input;
pub mod mock;
pub mod native;
mod params;
mod postprocess;
mod registry;
pub mod utils;

pub use algorithm::{Algorithm, AlgorithmSpec, NativeAlgorithm};
pub use audio::{AudioFormat, AudioVector, PcmFormat};
pub use context::{LibraryPaths, NativeContext};
pub use input::{Input, SourceInfo};
pub use native::{ComputeStatus, DynamicLibrary, NativeApi, RawHandle};
pub use params::{parameters_from_json, ParameterValue, Parameters};
pub use postprocess::{post_process, Field, Output, OutputContext};
pub use registry::{Constructor, Registry};
pub use utils::WindowType;
