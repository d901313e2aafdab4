//! Native C-ABI boundary
//!
//! [`NativeApi`] is the seam between the marshaling runtime and the loaded
//! library. [`DynamicLibrary`] binds a real shared library through
//! `libloading`; tests substitute a recording implementation.
//!
//! Symbol conventions:
//!
//! * `essentia_create_<lowercased name>() -> handle`
//! * `essentia_algorithm_set_{int,real,string,bool,real_vector,string_vector}_parameter`
//! * `essentia_algorithm_compute(handle, in, in_len, out, out_cap, *out_len) -> status`
//! * `essentia_delete_algorithm(handle)`

use std::collections::BTreeSet;
use std::ffi::{c_char, c_float, c_int, c_void, CString};
use std::fs;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::error::{Result, SigbindError};

/// Prefix shared by every exported symbol
pub const SYMBOL_PREFIX: &str = "essentia_";

const SET_INT: &str = "essentia_algorithm_set_int_parameter";
const SET_REAL: &str = "essentia_algorithm_set_real_parameter";
const SET_STRING: &str = "essentia_algorithm_set_string_parameter";
const SET_BOOL: &str = "essentia_algorithm_set_bool_parameter";
const SET_REAL_VECTOR: &str = "essentia_algorithm_set_real_vector_parameter";
const SET_STRING_VECTOR: &str = "essentia_algorithm_set_string_vector_parameter";
const COMPUTE: &str = "essentia_algorithm_compute";
const DELETE: &str = "essentia_delete_algorithm";

static DECLARED_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(essentia_\w+)\s*\(").expect("function declaration pattern is valid")
});

type CreateFn = unsafe extern "C" fn() -> *mut c_void;
type SetIntFn = unsafe extern "C" fn(*mut c_void, *const c_char, c_int) -> c_int;
type SetRealFn = unsafe extern "C" fn(*mut c_void, *const c_char, c_float) -> c_int;
type SetStringFn = unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char) -> c_int;
type SetBoolFn = unsafe extern "C" fn(*mut c_void, *const c_char, bool) -> c_int;
type SetRealVectorFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *const c_float, c_int) -> c_int;
type SetStringVectorFn =
    unsafe extern "C" fn(*mut c_void, *const c_char, *const *const c_char, c_int) -> c_int;
type ComputeFn = unsafe extern "C" fn(
    *mut c_void,
    *const c_float,
    c_int,
    *mut c_float,
    c_int,
    *mut c_int,
) -> c_int;
type DeleteFn = unsafe extern "C" fn(*mut c_void);

/// Opaque reference to a constructed native algorithm instance
///
/// Not `Clone`: exactly one owner, and [`NativeApi::destroy`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct RawHandle(NonNull<c_void>);

// SAFETY: a handle may move between threads with its owner; it is never
// shared, since it is neither `Clone` nor `Sync`.
unsafe impl Send for RawHandle {}

impl RawHandle {
    /// Wrap a pointer returned by a constructor; `None` for null
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(RawHandle)
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Status and output length reported by one native compute call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeStatus {
    /// Zero on success
    pub code: i32,
    /// Number of values the native side wrote (or wanted to write)
    pub written: usize,
}

/// Operations the marshaling runtime needs from the native library
pub trait NativeApi: Send + Sync {
    /// Whether the library declares `symbol`
    fn declares(&self, symbol: &str) -> bool;

    /// Call a zero-argument constructor; `None` when it returns null
    fn create(&self, symbol: &str) -> Result<Option<RawHandle>>;

    fn set_int(&self, handle: &RawHandle, name: &str, value: i32) -> Result<()>;
    fn set_real(&self, handle: &RawHandle, name: &str, value: f32) -> Result<()>;
    fn set_string(&self, handle: &RawHandle, name: &str, value: &str) -> Result<()>;
    fn set_bool(&self, handle: &RawHandle, name: &str, value: bool) -> Result<()>;
    fn set_real_vector(&self, handle: &RawHandle, name: &str, values: &[f32]) -> Result<()>;
    fn set_string_vector(&self, handle: &RawHandle, name: &str, values: &[String])
        -> Result<()>;

    /// Run the algorithm over `input`, writing at most `output.len()` values
    fn compute(&self, handle: &RawHandle, input: &[f32], output: &mut [f32])
        -> Result<ComputeStatus>;

    /// Release the instance; the handle cannot be used afterwards
    fn destroy(&self, handle: RawHandle) -> Result<()>;
}

/// Narrow a host numeric array to the native float layout, order preserved
pub fn pack_real_vector(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}

/// Copy strings into owned NUL-terminated buffers
pub fn pack_string_vector(name: &str, values: &[String]) -> Result<Vec<CString>> {
    values.iter().map(|value| c_string(name, value)).collect()
}

fn c_string(name: &str, value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| SigbindError::InvalidParameterValue {
        parameter: name.to_string(),
        reason: "contains an interior NUL byte".to_string(),
    })
}

fn c_len(name: &str, len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| SigbindError::InvalidParameterValue {
        parameter: name.to_string(),
        reason: format!("length {} exceeds the native limit", len),
    })
}

/// Function names declared in a C header
pub fn declared_functions(header: &str) -> BTreeSet<String> {
    DECLARED_FUNCTION
        .captures_iter(header)
        .map(|captures| captures[1].to_string())
        .collect()
}

/// A shared library bound through `libloading`
pub struct DynamicLibrary {
    library: libloading::Library,
    path: PathBuf,
    declared: BTreeSet<String>,
}

impl std::fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLibrary")
            .field("path", &self.path)
            .field("declared", &self.declared.len())
            .finish()
    }
}

impl DynamicLibrary {
    /// Load `library`, restricting symbol lookups to what `header` declares
    pub fn open(library: &Path, header: &Path) -> Result<Self> {
        let header_text = fs::read_to_string(header)?;
        let declared = declared_functions(&header_text);

        // SAFETY: loading runs the library's initialisers; the library is
        // the one the caller configured.
        let handle = unsafe { libloading::Library::new(library) }.map_err(|e| {
            SigbindError::LibraryLoad {
                path: library.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        debug!(
            "Loaded {} ({} declared functions)",
            library.display(),
            declared.len()
        );

        Ok(Self {
            library: handle,
            path: library.to_path_buf(),
            declared,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn symbol<T>(&self, name: &str) -> Result<libloading::Symbol<'_, T>> {
        if !self.declared.contains(name) {
            return Err(SigbindError::SymbolNotFound {
                symbol: name.to_string(),
            });
        }
        // SAFETY: `T` matches the C declaration for every symbol this module
        // resolves.
        unsafe { self.library.get::<T>(name.as_bytes()) }.map_err(|_| {
            SigbindError::SymbolNotFound {
                symbol: name.to_string(),
            }
        })
    }

    fn check(name: &str, status: c_int) -> Result<()> {
        if status == 0 {
            Ok(())
        } else {
            Err(SigbindError::InvalidParameterValue {
                parameter: name.to_string(),
                reason: format!("native setter returned {}", status),
            })
        }
    }
}

impl NativeApi for DynamicLibrary {
    fn declares(&self, symbol: &str) -> bool {
        self.declared.contains(symbol)
    }

    fn create(&self, symbol: &str) -> Result<Option<RawHandle>> {
        let create = self.symbol::<CreateFn>(symbol)?;
        // SAFETY: constructors take no arguments and return an owned handle.
        let ptr = unsafe { create() };
        Ok(RawHandle::from_ptr(ptr))
    }

    fn set_int(&self, handle: &RawHandle, name: &str, value: i32) -> Result<()> {
        let setter = self.symbol::<SetIntFn>(SET_INT)?;
        let key = c_string(name, name)?;
        // SAFETY: `handle` is live and `key` outlives the call.
        let status = unsafe { setter(handle.as_ptr(), key.as_ptr(), value) };
        Self::check(name, status)
    }

    fn set_real(&self, handle: &RawHandle, name: &str, value: f32) -> Result<()> {
        let setter = self.symbol::<SetRealFn>(SET_REAL)?;
        let key = c_string(name, name)?;
        // SAFETY: as for `set_int`.
        let status = unsafe { setter(handle.as_ptr(), key.as_ptr(), value) };
        Self::check(name, status)
    }

    fn set_string(&self, handle: &RawHandle, name: &str, value: &str) -> Result<()> {
        let setter = self.symbol::<SetStringFn>(SET_STRING)?;
        let key = c_string(name, name)?;
        let value = c_string(name, value)?;
        // SAFETY: both strings outlive the call; the library copies them.
        let status = unsafe { setter(handle.as_ptr(), key.as_ptr(), value.as_ptr()) };
        Self::check(name, status)
    }

    fn set_bool(&self, handle: &RawHandle, name: &str, value: bool) -> Result<()> {
        let setter = self.symbol::<SetBoolFn>(SET_BOOL)?;
        let key = c_string(name, name)?;
        // SAFETY: as for `set_int`.
        let status = unsafe { setter(handle.as_ptr(), key.as_ptr(), value) };
        Self::check(name, status)
    }

    fn set_real_vector(&self, handle: &RawHandle, name: &str, values: &[f32]) -> Result<()> {
        let setter = self.symbol::<SetRealVectorFn>(SET_REAL_VECTOR)?;
        let key = c_string(name, name)?;
        let len = c_len(name, values.len())?;
        // SAFETY: `values` is a live slice of exactly `len` floats.
        let status = unsafe { setter(handle.as_ptr(), key.as_ptr(), values.as_ptr(), len) };
        Self::check(name, status)
    }

    fn set_string_vector(
        &self,
        handle: &RawHandle,
        name: &str,
        values: &[String],
    ) -> Result<()> {
        let setter = self.symbol::<SetStringVectorFn>(SET_STRING_VECTOR)?;
        let key = c_string(name, name)?;
        let owned = pack_string_vector(name, values)?;
        let pointers: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        let len = c_len(name, pointers.len())?;
        // SAFETY: `pointers` borrows from `owned`, which outlives the call.
        let status = unsafe { setter(handle.as_ptr(), key.as_ptr(), pointers.as_ptr(), len) };
        Self::check(name, status)
    }

    fn compute(
        &self,
        handle: &RawHandle,
        input: &[f32],
        output: &mut [f32],
    ) -> Result<ComputeStatus> {
        let compute = self.symbol::<ComputeFn>(COMPUTE)?;
        let input_len = c_len("input", input.len())?;
        let capacity = c_len("output", output.len())?;
        let mut written: c_int = 0;
        // SAFETY: both buffers are live for the call and their lengths are
        // passed alongside; `written` is a valid out-pointer.
        let code = unsafe {
            compute(
                handle.as_ptr(),
                input.as_ptr(),
                input_len,
                output.as_mut_ptr(),
                capacity,
                &mut written,
            )
        };
        Ok(ComputeStatus {
            code,
            written: usize::try_from(written).unwrap_or(0),
        })
    }

    fn destroy(&self, handle: RawHandle) -> Result<()> {
        let delete = self.symbol::<DeleteFn>(DELETE)?;
        // SAFETY: `handle` is consumed, so it cannot be released twice.
        unsafe { delete(handle.as_ptr()) };
        Ok(())
    }
}
