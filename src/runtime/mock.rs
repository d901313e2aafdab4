//! In-process stand-in for the native library
//!
//! [`RecordingApi`] records every boundary call and replays canned outputs,
//! so wrappers and generated code can be exercised without the shared
//! library installed.

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::native::{ComputeStatus, NativeApi, RawHandle};
use crate::error::{Result, SigbindError};

/// One recorded boundary call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(String),
    SetInt { name: String, value: i32 },
    SetReal { name: String, value: f32 },
    SetString { name: String, value: String },
    SetBool { name: String, value: bool },
    SetRealVector { name: String, values: Vec<f32> },
    SetStringVector { name: String, values: Vec<String> },
    Compute { symbol: String, input: Vec<f32>, capacity: usize },
    Destroy(String),
}

impl Call {
    pub fn is_create(&self) -> bool {
        matches!(self, Call::Create(_))
    }

    pub fn is_destroy(&self) -> bool {
        matches!(self, Call::Destroy(_))
    }

    pub fn is_compute(&self) -> bool {
        matches!(self, Call::Compute { .. })
    }
}

/// Shared view of the calls a [`RecordingApi`] has seen
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<Call>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, call: Call) {
        self.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Recording [`NativeApi`] with canned outputs keyed by constructor symbol
#[derive(Debug, Default)]
pub struct RecordingApi {
    log: CallLog,
    outputs: HashMap<String, Vec<f32>>,
    null_constructors: HashSet<String>,
    rejected_parameters: HashSet<String>,
    status: i32,
    live: Mutex<HashMap<usize, String>>,
    next_handle: AtomicUsize,
}

impl RecordingApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values written by compute for handles built from `symbol`
    pub fn with_output(mut self, symbol: &str, values: Vec<f32>) -> Self {
        self.outputs.insert(symbol.to_string(), values);
        self
    }

    /// Make the constructor for `symbol` return null
    pub fn with_null_constructor(mut self, symbol: &str) -> Self {
        self.null_constructors.insert(symbol.to_string());
        self
    }

    /// Make every setter for `name` report a non-zero status
    pub fn rejecting_parameter(mut self, name: &str) -> Self {
        self.rejected_parameters.insert(name.to_string());
        self
    }

    /// Status returned by every compute call
    pub fn with_status(mut self, code: i32) -> Self {
        self.status = code;
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Handles created and not yet destroyed
    pub fn live_handles(&self) -> usize {
        self.live_map().len()
    }

    fn live_map(&self) -> MutexGuard<'_, HashMap<usize, String>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn symbol_of(&self, handle: &RawHandle) -> Result<String> {
        self.live_map()
            .get(&(handle.as_ptr() as usize))
            .cloned()
            .ok_or_else(|| SigbindError::SymbolNotFound {
                symbol: format!("handle {:p}", handle.as_ptr()),
            })
    }

    fn setter(&self, handle: &RawHandle, name: &str, call: Call) -> Result<()> {
        self.symbol_of(handle)?;
        self.log.push(call);
        if self.rejected_parameters.contains(name) {
            return Err(SigbindError::InvalidParameterValue {
                parameter: name.to_string(),
                reason: "native setter returned 1".to_string(),
            });
        }
        Ok(())
    }
}

impl NativeApi for RecordingApi {
    fn declares(&self, _symbol: &str) -> bool {
        true
    }

    fn create(&self, symbol: &str) -> Result<Option<RawHandle>> {
        self.log.push(Call::Create(symbol.to_string()));
        if self.null_constructors.contains(symbol) {
            return Ok(None);
        }
        // Fake addresses, never dereferenced
        let id = (self.next_handle.fetch_add(1, Ordering::Relaxed) + 1) * 16;
        self.live_map().insert(id, symbol.to_string());
        Ok(RawHandle::from_ptr(id as *mut c_void))
    }

    fn set_int(&self, handle: &RawHandle, name: &str, value: i32) -> Result<()> {
        let call = Call::SetInt { name: name.to_string(), value };
        self.setter(handle, name, call)
    }

    fn set_real(&self, handle: &RawHandle, name: &str, value: f32) -> Result<()> {
        let call = Call::SetReal { name: name.to_string(), value };
        self.setter(handle, name, call)
    }

    fn set_string(&self, handle: &RawHandle, name: &str, value: &str) -> Result<()> {
        let call = Call::SetString {
            name: name.to_string(),
            value: value.to_string(),
        };
        self.setter(handle, name, call)
    }

    fn set_bool(&self, handle: &RawHandle, name: &str, value: bool) -> Result<()> {
        let call = Call::SetBool { name: name.to_string(), value };
        self.setter(handle, name, call)
    }

    fn set_real_vector(&self, handle: &RawHandle, name: &str, values: &[f32]) -> Result<()> {
        let call = Call::SetRealVector {
            name: name.to_string(),
            values: values.to_vec(),
        };
        self.setter(handle, name, call)
    }

    fn set_string_vector(
        &self,
        handle: &RawHandle,
        name: &str,
        values: &[String],
    ) -> Result<()> {
        let call = Call::SetStringVector {
            name: name.to_string(),
            values: values.to_vec(),
        };
        self.setter(handle, name, call)
    }

    fn compute(
        &self,
        handle: &RawHandle,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<ComputeStatus> {
        let symbol = self.symbol_of(handle)?;
        self.log.push(Call::Compute {
            symbol: symbol.clone(),
            input: input.to_vec(),
            capacity: output.len(),
        });

        let canned = self.outputs.get(&symbol).map(Vec::as_slice).unwrap_or_default();
        let copied = canned.len().min(output.len());
        output[..copied].copy_from_slice(&canned[..copied]);
        Ok(ComputeStatus {
            code: self.status,
            written: canned.len(),
        })
    }

    fn destroy(&self, handle: RawHandle) -> Result<()> {
        let symbol = self
            .live_map()
            .remove(&(handle.as_ptr() as usize))
            .ok_or_else(|| SigbindError::SymbolNotFound {
                symbol: format!("handle {:p}", handle.as_ptr()),
            })?;
        self.log.push(Call::Destroy(symbol));
        Ok(())
    }
}
