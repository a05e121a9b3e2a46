//! Fixture Runtime
//!
//! Loads a fixture module, stages values in its linear memory and calls its
//! entry points with the WASM-level types each convention expects.

mod interface_check;
mod marshal;

pub use interface_check::{validate_exports, InterfaceError};
pub use marshal::WasmPrimitive;

use marshal_abi::{AppendError, ScalarKind, GREETING_SUFFIX};
use thiserror::Error;
use tracing::debug;
use wasmtime::{Engine, Instance as WasmtimeInstance, Linker, Memory, Module, Store};

/// Size of a WASM linear memory page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Filler written after the terminator of staged strings, so a guest that
/// ignores the terminator does not see zeros by accident.
const STRING_FILLER: u8 = 0xAA;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    #[error("WASM execution error: {0}")]
    WasmError(String),

    #[error("Memory error: {0}")]
    MemoryError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid value from guest: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Interface(#[from] InterfaceError),
}

/// The fixture runtime
pub struct Runtime {
    engine: Engine,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            engine: Engine::default(),
        }
    }

    /// Load a WASM module from binary or text format
    pub fn load_module(&self, wasm_bytes: &[u8]) -> Result<CompiledModule<'_>, RuntimeError> {
        let module = Module::new(&self.engine, wasm_bytes)
            .map_err(|e| RuntimeError::WasmError(e.to_string()))?;
        Ok(CompiledModule {
            module,
            engine: &self.engine,
        })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled WASM module, ready to be instantiated
pub struct CompiledModule<'a> {
    module: Module,
    engine: &'a Engine,
}

impl<'a> CompiledModule<'a> {
    /// Instantiate the module. The fixture takes no imports.
    pub fn instantiate(&self) -> Result<Instance, RuntimeError> {
        let mut store = Store::new(self.engine, ());
        let linker = Linker::<()>::new(self.engine);

        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| RuntimeError::WasmError(e.to_string()))?;

        Ok(Instance {
            store,
            instance,
            scratch: None,
        })
    }
}

/// A host-owned region of linear memory.
///
/// Lives in pages the host grew itself, so it never overlaps the guest's
/// data, stack or heap.
#[derive(Debug, Clone, Copy)]
struct Scratch {
    base: usize,
    len: usize,
}

/// Result of a string append call.
#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    /// The guest appended; `reported_len` is its return value.
    Appended { contents: String, reported_len: usize },
    /// The guest refused; `contents` is what the buffer holds afterwards.
    Rejected { error: AppendError, contents: String },
}

/// A running fixture instance
pub struct Instance {
    store: Store<()>,
    instance: WasmtimeInstance,
    scratch: Option<Scratch>,
}

impl Instance {
    /// Validate that this instance exports every entry point for `kinds`
    /// with the expected signatures.
    pub fn validate_exports(&mut self, kinds: &[ScalarKind]) -> Result<(), InterfaceError> {
        validate_exports(&mut self.store, &self.instance, kinds)
    }

    /// Get the exported memory (assumes it's named "memory")
    fn get_memory(&mut self) -> Result<Memory, RuntimeError> {
        self.instance
            .get_memory(&mut self.store, "memory")
            .ok_or_else(|| RuntimeError::MemoryError("no exported memory named 'memory'".into()))
    }

    /// Write bytes to the instance's memory at the given offset
    pub fn write_memory(&mut self, offset: usize, data: &[u8]) -> Result<(), RuntimeError> {
        let memory = self.get_memory()?;
        memory
            .write(&mut self.store, offset, data)
            .map_err(|e| RuntimeError::MemoryError(e.to_string()))
    }

    /// Read bytes from the instance's memory
    pub fn read_memory(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, RuntimeError> {
        let memory = self.get_memory()?;
        let mut buffer = vec![0u8; len];
        memory
            .read(&self.store, offset, &mut buffer)
            .map_err(|e| RuntimeError::MemoryError(e.to_string()))?;
        Ok(buffer)
    }

    /// Get the current memory size in bytes
    pub fn memory_size(&mut self) -> Result<usize, RuntimeError> {
        let memory = self.get_memory()?;
        Ok(memory.data_size(&self.store))
    }

    /// Reserve at least `len` bytes of scratch memory and return its offset.
    ///
    /// The first call grows memory by whole pages. Later calls reuse the
    /// region, extending it in place while it still ends at the end of
    /// memory.
    pub fn scratch(&mut self, len: usize) -> Result<usize, RuntimeError> {
        let memory = self.get_memory()?;
        let size = memory.data_size(&self.store);

        if let Some(scratch) = self.scratch {
            if scratch.len >= len {
                return Ok(scratch.base);
            }
            if scratch.base + scratch.len == size {
                let grown = grow(&memory, &mut self.store, len - scratch.len)?;
                self.scratch = Some(Scratch {
                    base: scratch.base,
                    len: scratch.len + grown,
                });
                return Ok(scratch.base);
            }
        }

        let base = size;
        let grown = grow(&memory, &mut self.store, len)?;
        debug!(base, len = grown, "reserved scratch memory");
        self.scratch = Some(Scratch { base, len: grown });
        Ok(base)
    }

    /// Call `(T) -> T`.
    pub fn call_value<T: WasmPrimitive>(
        &mut self,
        name: &str,
        value: T,
    ) -> Result<T, RuntimeError> {
        let func = self
            .instance
            .get_typed_func::<T::Abi, T::Abi>(&mut self.store, name)
            .map_err(|e| RuntimeError::FunctionNotFound(format!("{}: {}", name, e)))?;

        let out = func
            .call(&mut self.store, value.to_abi())
            .map_err(|e| RuntimeError::WasmError(e.to_string()))?;

        let result = T::from_abi(out).ok_or_else(|| {
            RuntimeError::InvalidValue(format!("{} returned {:?}", name, out))
        })?;
        debug!(function = name, input = ?value, output = ?result, "value call");
        Ok(result)
    }

    /// Call `(ptr) -> ()` on a single staged cell and read the cell back.
    ///
    /// `None` passes the null address and returns `None`.
    pub fn call_ref<T: WasmPrimitive>(
        &mut self,
        name: &str,
        value: Option<T>,
    ) -> Result<Option<T>, RuntimeError> {
        let func = self
            .instance
            .get_typed_func::<i32, ()>(&mut self.store, name)
            .map_err(|e| RuntimeError::FunctionNotFound(format!("{}: {}", name, e)))?;

        let Some(value) = value else {
            func.call(&mut self.store, 0)
                .map_err(|e| RuntimeError::WasmError(e.to_string()))?;
            debug!(function = name, "reference call with null");
            return Ok(None);
        };

        let size = T::KIND.size();
        let offset = self.scratch(size)?;
        let mut bytes = Vec::with_capacity(size);
        value.write_le(&mut bytes);
        self.write_memory(offset, &bytes)?;

        func.call(&mut self.store, wasm_ptr(offset)?)
            .map_err(|e| RuntimeError::WasmError(e.to_string()))?;

        let bytes = self.read_memory(offset, size)?;
        let result = T::read_le(&bytes).ok_or_else(|| {
            RuntimeError::InvalidValue(format!("{} stored {:02x?}", name, bytes))
        })?;
        debug!(function = name, input = ?value, output = ?result, "reference call");
        Ok(Some(result))
    }

    /// Call `(ptr, count) -> ()` on a staged copy of `values`.
    ///
    /// All of `values` is staged and read back, but only the first `count`
    /// elements are announced to the guest.
    pub fn call_buffer<T: WasmPrimitive>(
        &mut self,
        name: &str,
        values: &[T],
        count: usize,
    ) -> Result<Vec<T>, RuntimeError> {
        if count > values.len() {
            return Err(RuntimeError::InvalidArgument(format!(
                "count {} exceeds buffer of {} elements",
                count,
                values.len()
            )));
        }
        let wasm_count = i32::try_from(count)
            .map_err(|_| RuntimeError::InvalidArgument(format!("count {} too large", count)))?;

        let func = self
            .instance
            .get_typed_func::<(i32, i32), ()>(&mut self.store, name)
            .map_err(|e| RuntimeError::FunctionNotFound(format!("{}: {}", name, e)))?;

        let size = T::KIND.size();
        let mut bytes = Vec::with_capacity(values.len() * size);
        for value in values {
            value.write_le(&mut bytes);
        }
        let offset = self.scratch(bytes.len())?;
        self.write_memory(offset, &bytes)?;

        func.call(&mut self.store, (wasm_ptr(offset)?, wasm_count))
            .map_err(|e| RuntimeError::WasmError(e.to_string()))?;

        let bytes = self.read_memory(offset, values.len() * size)?;
        let result = bytes
            .chunks_exact(size)
            .map(T::read_le)
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| {
                RuntimeError::InvalidValue(format!("{} stored an invalid {}", name, T::KIND))
            })?;
        debug!(function = name, len = values.len(), count, "buffer call");
        Ok(result)
    }

    /// Call `(ptr, capacity) -> i32` on a staged NUL-terminated copy of
    /// `input` inside a buffer of `capacity` bytes.
    ///
    /// When `input` fills the whole capacity no terminator is staged, which
    /// lets callers exercise the guest's unterminated-buffer path.
    pub fn call_string_append(
        &mut self,
        name: &str,
        input: &str,
        capacity: usize,
    ) -> Result<AppendOutcome, RuntimeError> {
        if input.as_bytes().contains(&0) {
            return Err(RuntimeError::InvalidArgument(
                "input contains a NUL byte".into(),
            ));
        }
        if input.len() > capacity {
            return Err(RuntimeError::InvalidArgument(format!(
                "input of {} bytes does not fit capacity {}",
                input.len(),
                capacity
            )));
        }
        let wasm_capacity = i32::try_from(capacity).map_err(|_| {
            RuntimeError::InvalidArgument(format!("capacity {} too large", capacity))
        })?;

        let func = self
            .instance
            .get_typed_func::<(i32, i32), i32>(&mut self.store, name)
            .map_err(|e| RuntimeError::FunctionNotFound(format!("{}: {}", name, e)))?;

        let mut buffer = vec![STRING_FILLER; capacity];
        buffer[..input.len()].copy_from_slice(input.as_bytes());
        if input.len() < capacity {
            buffer[input.len()] = 0;
        }
        let offset = self.scratch(capacity)?;
        self.write_memory(offset, &buffer)?;

        let status = func
            .call(&mut self.store, (wasm_ptr(offset)?, wasm_capacity))
            .map_err(|e| RuntimeError::WasmError(e.to_string()))?;

        let after = self.read_memory(offset, capacity)?;
        let end = after.iter().position(|&b| b == 0).unwrap_or(after.len());
        let contents = String::from_utf8_lossy(&after[..end]).into_owned();
        debug!(function = name, input, capacity, status, "string append call");

        if status >= 0 {
            return Ok(AppendOutcome::Appended {
                contents,
                reported_len: status as usize,
            });
        }

        let error = match AppendError::from_code(status) {
            Some(AppendError::InsufficientCapacity { .. }) => AppendError::InsufficientCapacity {
                needed: input.len() + GREETING_SUFFIX.len() + 1,
                capacity,
            },
            Some(error) => error,
            None => {
                return Err(RuntimeError::WasmError(format!(
                    "function '{}' returned unknown status {}",
                    name, status
                )))
            }
        };
        Ok(AppendOutcome::Rejected { error, contents })
    }
}

/// Grow `memory` by enough pages for `len` bytes (at least one page) and
/// return the number of bytes added.
fn grow(memory: &Memory, store: &mut Store<()>, len: usize) -> Result<usize, RuntimeError> {
    let pages = len.div_ceil(WASM_PAGE_SIZE).max(1);
    memory
        .grow(&mut *store, pages as u64)
        .map_err(|e| {
            RuntimeError::MemoryError(format!("failed to grow by {} pages: {}", pages, e))
        })?;
    Ok(pages * WASM_PAGE_SIZE)
}

/// Convert a linear memory offset into a wasm32 pointer argument.
fn wasm_ptr(offset: usize) -> Result<i32, RuntimeError> {
    u32::try_from(offset)
        .map(|p| p as i32)
        .map_err(|_| RuntimeError::MemoryError(format!("offset {} outside wasm32 range", offset)))
}
