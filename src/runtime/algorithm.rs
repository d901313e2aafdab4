//! Algorithm wrappers over native handles
//!
//! A [`NativeAlgorithm`] owns at most one native handle. The handle is
//! created on the first compute call, configured with every stored
//! parameter, and released exactly once: by [`NativeAlgorithm::release`] or
//! on drop, whichever comes first.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use super::context::NativeContext;
use super::input::{self, Input, SourceInfo};
use super::native::{pack_real_vector, ComputeStatus, RawHandle};
use super::params::{ParameterValue, Parameters};
use super::postprocess::{post_process, Output, OutputContext};
use crate::error::{Result, SigbindError};
use crate::metadata::{Category, Mode};

/// Static description of one generated wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmSpec {
    pub name: &'static str,
    pub category: Category,
    pub mode: Mode,
    /// Accepted parameter names; empty accepts any name
    pub valid_parameters: &'static [&'static str],
}

impl AlgorithmSpec {
    pub fn accepts_parameter(&self, name: &str) -> bool {
        self.valid_parameters.is_empty() || self.valid_parameters.contains(&name)
    }

    /// Symbol of the zero-argument native constructor
    pub fn constructor_symbol(&self) -> String {
        format!("essentia_create_{}", self.name.to_lowercase())
    }
}

/// Common interface of every generated wrapper
pub trait Algorithm: Send + fmt::Debug {
    fn spec(&self) -> &AlgorithmSpec;

    fn name(&self) -> &str {
        self.spec().name
    }

    fn category(&self) -> Category {
        self.spec().category
    }

    fn mode(&self) -> Mode {
        self.spec().mode
    }

    /// Parameters stored so far
    fn parameters(&self) -> &Parameters;

    /// Store (and, once configured, push) one parameter
    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()>;

    fn compute(&mut self, input: &Input) -> Result<Output>;
}

enum HandleState {
    Uninitialized,
    Configured(RawHandle),
    Destroyed,
}

impl HandleState {
    fn label(&self) -> &'static str {
        match self {
            HandleState::Uninitialized => "uninitialized",
            HandleState::Configured(_) => "configured",
            HandleState::Destroyed => "destroyed",
        }
    }
}

/// Generic wrapper driving one native algorithm
pub struct NativeAlgorithm {
    spec: AlgorithmSpec,
    ctx: Arc<NativeContext>,
    parameters: Parameters,
    state: HandleState,
    output_capacity: Option<usize>,
}

impl fmt::Debug for NativeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeAlgorithm")
            .field("name", &self.spec.name)
            .field("parameters", &self.parameters)
            .field("state", &self.state.label())
            .finish()
    }
}

impl NativeAlgorithm {
    /// Construct without touching the native side; unknown parameter names
    /// are rejected here
    pub fn new(
        spec: AlgorithmSpec,
        ctx: Arc<NativeContext>,
        parameters: Parameters,
    ) -> Result<Self> {
        for name in parameters.keys() {
            check_parameter(&spec, name)?;
        }
        Ok(Self {
            spec,
            ctx,
            parameters,
            state: HandleState::Uninitialized,
            output_capacity: None,
        })
    }

    /// Use a fixed output buffer size instead of the per-category estimate;
    /// loaders still grow past it when the native side reports more
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = Some(capacity);
        self
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.state, HandleState::Configured(_))
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, HandleState::Destroyed)
    }

    /// Run the native algorithm and return its unshaped output
    pub fn compute_raw(&mut self, input: &Input) -> Result<Vec<f32>> {
        let source = self.source_of(input);
        self.run(input, source)
    }

    /// Header of the file a loader is about to read
    fn source_of(&self, input: &Input) -> Option<SourceInfo> {
        if input::is_loader(self.spec.name) {
            input.path().and_then(SourceInfo::read)
        } else {
            None
        }
    }

    fn run(&mut self, input: &Input, source: Option<SourceInfo>) -> Result<Vec<f32>> {
        if self.is_destroyed() {
            return Err(SigbindError::HandleDestroyed {
                algorithm: self.spec.name.to_string(),
            });
        }
        input::validate(&self.spec, input)?;

        let buffer = input.buffer();
        let capacity = self.output_capacity.unwrap_or_else(|| {
            input::estimate_output_capacity(&self.spec, input, &self.parameters, source)
        });

        self.ensure_handle()?;
        let HandleState::Configured(handle) = &self.state else {
            return Err(SigbindError::HandleDestroyed {
                algorithm: self.spec.name.to_string(),
            });
        };
        if let Some(path) = input.path() {
            let filename = path.to_string_lossy();
            self.ctx.api().set_string(handle, "filename", &filename)?;
        }
        let call = |output: &mut [f32]| -> Result<ComputeStatus> {
            let status = self.ctx.api().compute(handle, &buffer, output)?;
            if status.code != 0 {
                return Err(SigbindError::NativeFailure {
                    algorithm: self.spec.name.to_string(),
                    code: status.code,
                });
            }
            Ok(status)
        };

        let mut output = vec![0.0f32; capacity];
        let mut status = call(&mut output)?;
        let mut capacity = capacity;
        if status.written > capacity && input::is_loader(self.spec.name) {
            debug!(
                "Growing {} output from {} to {} samples",
                self.spec.name, capacity, status.written
            );
            capacity = status.written;
            output = vec![0.0f32; capacity];
            status = call(&mut output)?;
        }
        if status.written > capacity {
            return Err(SigbindError::OutputOverflow {
                algorithm: self.spec.name.to_string(),
                produced: status.written,
                capacity,
            });
        }
        output.truncate(status.written);
        Ok(output)
    }

    /// Release the native handle now; later computes fail
    pub fn release(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, HandleState::Destroyed) {
            HandleState::Configured(handle) => {
                debug!("Destroying native handle for {}", self.spec.name);
                self.ctx.api().destroy(handle)
            }
            HandleState::Uninitialized | HandleState::Destroyed => Ok(()),
        }
    }

    fn ensure_handle(&mut self) -> Result<()> {
        if let HandleState::Uninitialized = self.state {
            let symbol = self.spec.constructor_symbol();
            let handle = self
                .ctx
                .api()
                .create(&symbol)?
                .ok_or_else(|| SigbindError::HandleCreation {
                    algorithm: self.spec.name.to_string(),
                })?;

            if let Err(e) = self.configure(&handle) {
                if let Err(destroy_err) = self.ctx.api().destroy(handle) {
                    warn!(
                        "Failed to release {} after configuration error: {}",
                        self.spec.name, destroy_err
                    );
                }
                return Err(e);
            }
            debug!(
                "Created native handle for {} ({} parameters)",
                self.spec.name,
                self.parameters.len()
            );
            self.state = HandleState::Configured(handle);
        }
        Ok(())
    }

    fn configure(&self, handle: &RawHandle) -> Result<()> {
        self.parameters
            .iter()
            .try_for_each(|(name, value)| push_parameter(&self.ctx, handle, name, value))
    }
}

impl Algorithm for NativeAlgorithm {
    fn spec(&self) -> &AlgorithmSpec {
        &self.spec
    }

    fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()> {
        check_parameter(&self.spec, name)?;
        if let HandleState::Configured(handle) = &self.state {
            push_parameter(&self.ctx, handle, name, &value)?;
        }
        self.parameters.insert(name.to_string(), value);
        Ok(())
    }

    fn compute(&mut self, input: &Input) -> Result<Output> {
        let source = self.source_of(input);
        let raw = self.run(input, source)?;
        let context = OutputContext::new(&self.parameters).with_source(source);
        Ok(post_process(self.spec.name, self.spec.category, &context, raw))
    }
}

impl Drop for NativeAlgorithm {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Failed to release native handle for {}: {}", self.spec.name, e);
        }
    }
}

fn check_parameter(spec: &AlgorithmSpec, name: &str) -> Result<()> {
    if spec.accepts_parameter(name) {
        Ok(())
    } else {
        Err(SigbindError::UnknownParameter {
            algorithm: spec.name.to_string(),
            parameter: name.to_string(),
        })
    }
}

/// Marshal one parameter to the matching native setter
///
/// Empty vectors are skipped; integers must fit the native `int`.
fn push_parameter(
    ctx: &NativeContext,
    handle: &RawHandle,
    name: &str,
    value: &ParameterValue,
) -> Result<()> {
    let api = ctx.api();
    match value {
        ParameterValue::Bool(b) => api.set_bool(handle, name, *b),
        ParameterValue::Int(i) => {
            let narrowed = i32::try_from(*i).map_err(|_| SigbindError::InvalidParameterValue {
                parameter: name.to_string(),
                reason: format!("{} does not fit a 32-bit integer", i),
            })?;
            api.set_int(handle, name, narrowed)
        }
        ParameterValue::Real(r) => api.set_real(handle, name, *r as f32),
        ParameterValue::Text(s) => api.set_string(handle, name, s),
        ParameterValue::RealVector(values) if values.is_empty() => Ok(()),
        ParameterValue::RealVector(values) => {
            api.set_real_vector(handle, name, &pack_real_vector(values))
        }
        ParameterValue::TextVector(values) if values.is_empty() => Ok(()),
        ParameterValue::TextVector(values) => api.set_string_vector(handle, name, values),
    }
}
