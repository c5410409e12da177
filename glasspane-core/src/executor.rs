//! Isolated script executor: one sandboxed Luau state per session, with a
//! fixed builder API and nothing else. No ambient host objects, no
//! network, no storage. Every builder call serializes to an [`Operation`]
//! on the session's queue; values that cannot be represented as
//! structured data are stripped before emission.

use crate::error::{CoreError, CoreResult};
use crate::protocol::Operation;
use glasspane_ui::{Props, MAX_VALUE_DEPTH};
use mlua::{Lua, ThreadStatus, VmState};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

/// Luau heap limit per session, same budget the host grants any untrusted
/// program.
pub const LUA_MEMORY_LIMIT_BYTES: usize = 1024 * 1024;

/// Console buffer cap; oldest output is discarded beyond this.
const CONSOLE_LIMIT_BYTES: usize = 16 * 1024;

/// Registry slots for program-local callables. Only opaque ids ever cross
/// the isolation boundary.
const HANDLERS_REGISTRY: &str = "glasspane_handlers";
const CALLBACKS_REGISTRY: &str = "glasspane_callbacks";

/// Globals replaced with raising stubs before any program code runs.
const BLOCKED_GLOBALS: &[&str] = &[
    "io", "os", "file", "require", "loadfile", "dofile", "coroutine", "debug",
];

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExecutorConfig {
    pub memory_limit_bytes: usize,
    /// Wall-clock budget for the program's top-level run.
    pub program_timeout_ms: u64,
    /// Wall-clock budget per event handler or call-result callback.
    pub handler_timeout_ms: u64,
    /// Maximum program source size; oversized programs fail at load.
    pub max_program_bytes: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: LUA_MEMORY_LIMIT_BYTES,
            program_timeout_ms: 1_000,
            handler_timeout_ms: 200,
            max_program_bytes: 64 * 1024,
        }
    }
}

impl ExecutorConfig {
    pub fn program_timeout(&self) -> Duration {
        Duration::from_millis(self.program_timeout_ms)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

/// State shared between the Rust side and the builder-API closures.
struct ExecShared {
    ops: Mutex<Vec<Operation>>,
    /// Element id 0 is the session root; program-created ids start at 1.
    next_element_id: AtomicU64,
    next_handler_id: AtomicU64,
    next_correlation_id: AtomicU64,
    console: Mutex<String>,
}

impl ExecShared {
    fn push_op(&self, op: Operation) {
        self.ops.lock().unwrap().push(op);
    }

    fn append_console(&self, line: &str) {
        let mut console = self.console.lock().unwrap();
        console.push_str(line);
        if console.len() > CONSOLE_LIMIT_BYTES {
            let cut = console.len() - CONSOLE_LIMIT_BYTES;
            console.drain(..cut);
        }
    }
}

pub struct ScriptExecutor {
    lua: Lua,
    shared: Arc<ExecShared>,
    config: ExecutorConfig,
}

impl ScriptExecutor {
    /// Build the isolated state: sandbox, memory limit, blocked globals,
    /// cooperative interrupt, and the `ui`/`host` builder tables.
    pub fn new(config: ExecutorConfig) -> CoreResult<Self> {
        let shared = Arc::new(ExecShared {
            ops: Mutex::new(Vec::new()),
            next_element_id: AtomicU64::new(1),
            next_handler_id: AtomicU64::new(1),
            next_correlation_id: AtomicU64::new(1),
            console: Mutex::new(String::new()),
        });

        let lua = Lua::new();
        let _ = lua.sandbox(true);
        lua.set_memory_limit(config.memory_limit_bytes)
            .map_err(|e| CoreError::Surface(e.to_string()))?;

        for name in BLOCKED_GLOBALS {
            let msg = format!("{} is not available in sandboxed programs", name);
            lua.globals()
                .set(
                    *name,
                    lua.create_function(move |_, _: mlua::Value| {
                        Err::<(), _>(mlua::Error::RuntimeError(msg.clone()))
                    })
                    .map_err(surface_err)?,
                )
                .map_err(surface_err)?;
        }

        // Yield back to the drive loop periodically, but never across a
        // Rust call frame.
        let count = AtomicU64::new(0);
        const MAX_STACK_LEVEL: usize = 64;
        lua.set_interrupt(move |lua| {
            for level in 0..=MAX_STACK_LEVEL {
                if let Some(what) = lua.inspect_stack(level, |debug| debug.source().what) {
                    if what == "C" {
                        return Ok(VmState::Continue);
                    }
                } else {
                    break;
                }
            }
            if count.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
                return Ok(VmState::Yield);
            }
            Ok(VmState::Continue)
        });

        lua.set_named_registry_value(HANDLERS_REGISTRY, lua.create_table().map_err(surface_err)?)
            .map_err(surface_err)?;
        lua.set_named_registry_value(CALLBACKS_REGISTRY, lua.create_table().map_err(surface_err)?)
            .map_err(surface_err)?;

        register_ui_api(&lua, Arc::clone(&shared))?;
        register_host_api(&lua, Arc::clone(&shared))?;
        register_print(&lua, Arc::clone(&shared))?;

        Ok(Self {
            lua,
            shared,
            config,
        })
    }

    /// Run the provider program to completion (cooperatively, with a
    /// wall-clock budget). Uncaught errors surface as `Execution` and
    /// never propagate further.
    pub fn run_program(&self, source: &str) -> CoreResult<()> {
        if source.len() > self.config.max_program_bytes {
            return Err(CoreError::Validation(format!(
                "program is {} bytes, limit is {}",
                source.len(),
                self.config.max_program_bytes
            )));
        }
        let func = self
            .lua
            .load(source)
            .into_function()
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        let thread = self
            .lua
            .create_thread(func)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        self.drive(&thread, None, Instant::now() + self.config.program_timeout())
    }

    /// Resume the program-local handler for a native event. Stale handler
    /// ids are a silent no-op.
    pub fn dispatch_event(&self, handler_id: u64, payload: &Value) -> CoreResult<bool> {
        let handlers: mlua::Table = self
            .lua
            .named_registry_value(HANDLERS_REGISTRY)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        let func: Option<mlua::Function> = handlers
            .get(handler_id)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        let Some(func) = func else {
            trace!(handler_id, "event for unknown handler dropped");
            return Ok(false);
        };
        let arg = json_to_lua(&self.lua, payload).map_err(|e| CoreError::Execution(e.to_string()))?;
        let thread = self
            .lua
            .create_thread(func)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        self.drive(
            &thread,
            Some(mlua::MultiValue::from_iter([arg])),
            Instant::now() + self.config.handler_timeout(),
        )?;
        Ok(true)
    }

    /// Resolve an earlier `host.invoke`. The stored callback (if any) is
    /// called as `callback(result, err)` and then released.
    pub fn deliver_call_result(
        &self,
        correlation_id: u64,
        result: &Result<Value, CoreError>,
    ) -> CoreResult<()> {
        let callbacks: mlua::Table = self
            .lua
            .named_registry_value(CALLBACKS_REGISTRY)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        let func: Option<mlua::Function> = callbacks
            .get(correlation_id)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        callbacks
            .set(correlation_id, mlua::Value::Nil)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        let Some(func) = func else {
            trace!(correlation_id, "call result had no registered callback");
            return Ok(());
        };
        let (value, err) = match result {
            Ok(value) => (
                json_to_lua(&self.lua, value).map_err(|e| CoreError::Execution(e.to_string()))?,
                mlua::Value::Nil,
            ),
            Err(e) => (
                mlua::Value::Nil,
                mlua::Value::String(
                    self.lua
                        .create_string(e.to_string())
                        .map_err(|e| CoreError::Execution(e.to_string()))?,
                ),
            ),
        };
        let thread = self
            .lua
            .create_thread(func)
            .map_err(|e| CoreError::Execution(e.to_string()))?;
        self.drive(
            &thread,
            Some(mlua::MultiValue::from_iter([value, err])),
            Instant::now() + self.config.handler_timeout(),
        )
    }

    /// Release the program-local handler for a removed element.
    pub fn remove_handler(&self, handler_id: u64) {
        if let Ok(handlers) = self.lua.named_registry_value::<mlua::Table>(HANDLERS_REGISTRY) {
            let _ = handlers.set(handler_id, mlua::Value::Nil);
        }
    }

    /// Take the operations emitted since the last drain. One drain is one
    /// batch: the reconciler's re-render boundary.
    pub fn drain_operations(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.shared.ops.lock().unwrap())
    }

    /// Captured `print` output, kept for diagnostics.
    pub fn console(&self) -> String {
        self.shared.console.lock().unwrap().clone()
    }

    fn drive(
        &self,
        thread: &mlua::Thread,
        mut first_args: Option<mlua::MultiValue>,
        deadline: Instant,
    ) -> CoreResult<()> {
        loop {
            match thread.status() {
                ThreadStatus::Resumable => {
                    if Instant::now() >= deadline {
                        return Err(CoreError::Execution(
                            "script exceeded its time budget".to_string(),
                        ));
                    }
                    let resumed = match first_args.take() {
                        Some(args) => thread.resume::<()>(args),
                        None => thread.resume::<()>(()),
                    };
                    if let Err(e) = resumed {
                        return Err(CoreError::Execution(e.to_string()));
                    }
                }
                ThreadStatus::Finished => return Ok(()),
                ThreadStatus::Error => {
                    return Err(CoreError::Execution("script failed".to_string()))
                }
                ThreadStatus::Running => return Ok(()),
            }
        }
    }
}

fn surface_err(e: mlua::Error) -> CoreError {
    CoreError::Surface(e.to_string())
}

/// Register the `ui` builder table: tree construction only, no host reach.
fn register_ui_api(lua: &Lua, shared: Arc<ExecShared>) -> CoreResult<()> {
    let ui = lua.create_table().map_err(surface_err)?;

    let s = Arc::clone(&shared);
    ui.set(
        "create",
        lua.create_function(move |_, (kind, props): (String, Option<mlua::Table>)| {
            let props = props
                .map(|t| table_to_props(&t))
                .transpose()?
                .unwrap_or_default();
            let id = s.next_element_id.fetch_add(1, Ordering::Relaxed);
            s.push_op(Operation::Create { id, kind, props });
            Ok(id)
        })
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    let s = Arc::clone(&shared);
    ui.set(
        "set_prop",
        lua.create_function(move |_, (id, key, value): (u64, String, mlua::Value)| {
            let value = lua_to_json(&value, 0).unwrap_or(Value::Null);
            s.push_op(Operation::SetAttribute { id, key, value });
            Ok(())
        })
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    let s = Arc::clone(&shared);
    ui.set(
        "append",
        lua.create_function(move |_, (parent, child): (u64, u64)| {
            s.push_op(Operation::AppendChild { parent, child });
            Ok(())
        })
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    let s = Arc::clone(&shared);
    ui.set(
        "remove",
        lua.create_function(move |_, (parent, child): (u64, u64)| {
            s.push_op(Operation::RemoveChild { parent, child });
            Ok(())
        })
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    let s = Arc::clone(&shared);
    ui.set(
        "set_text",
        lua.create_function(move |_, (id, text): (u64, String)| {
            s.push_op(Operation::SetText { id, text });
            Ok(())
        })
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    let s = Arc::clone(&shared);
    ui.set(
        "on",
        lua.create_function(
            move |lua, (id, event, func): (u64, String, mlua::Function)| {
                let handler_id = s.next_handler_id.fetch_add(1, Ordering::Relaxed);
                let handlers: mlua::Table = lua.named_registry_value(HANDLERS_REGISTRY)?;
                handlers.set(handler_id, func)?;
                s.push_op(Operation::AddEventListener {
                    id,
                    event,
                    handler_id,
                });
                Ok(handler_id)
            },
        )
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    ui.set(
        "root",
        lua.create_function(|_, ()| Ok(0u64)).map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    lua.globals().set("ui", ui).map_err(surface_err)?;
    Ok(())
}

/// Register the `host` table: `invoke` is the only way out, and it only
/// emits a serialized operation carrying a correlation id.
fn register_host_api(lua: &Lua, shared: Arc<ExecShared>) -> CoreResult<()> {
    let host = lua.create_table().map_err(surface_err)?;

    let s = Arc::clone(&shared);
    host.set(
        "invoke",
        lua.create_function(
            move |lua,
                  (operation, args, callback): (
                String,
                Option<mlua::Value>,
                Option<mlua::Function>,
            )| {
                let args = args
                    .as_ref()
                    .and_then(|v| lua_to_json(v, 0))
                    .unwrap_or(Value::Null);
                let correlation_id = s.next_correlation_id.fetch_add(1, Ordering::Relaxed);
                if let Some(callback) = callback {
                    let callbacks: mlua::Table = lua.named_registry_value(CALLBACKS_REGISTRY)?;
                    callbacks.set(correlation_id, callback)?;
                }
                s.push_op(Operation::InvokeHost {
                    operation,
                    args,
                    correlation_id,
                });
                Ok(correlation_id)
            },
        )
        .map_err(surface_err)?,
    )
    .map_err(surface_err)?;

    lua.globals().set("host", host).map_err(surface_err)?;
    Ok(())
}

/// Rebind `print` to the session diagnostic buffer.
fn register_print(lua: &Lua, shared: Arc<ExecShared>) -> CoreResult<()> {
    let print_fn = lua
        .create_function(move |_, args: mlua::Variadic<mlua::Value>| {
            let parts: Vec<String> = args
                .iter()
                .map(|v| match v {
                    mlua::Value::String(s) => {
                        s.to_str().map(|x| x.to_string()).unwrap_or_default()
                    }
                    mlua::Value::Integer(n) => n.to_string(),
                    mlua::Value::Number(n) => n.to_string(),
                    mlua::Value::Boolean(b) => b.to_string(),
                    mlua::Value::Nil => "nil".to_string(),
                    _ => format!("{:?}", v),
                })
                .collect();
            shared.append_console(&(parts.join("\t") + "\n"));
            Ok(())
        })
        .map_err(surface_err)?;
    lua.globals().set("print", print_fn).map_err(surface_err)?;
    Ok(())
}

/// Convert a Lua value to structured JSON. Functions, userdata, threads,
/// and non-finite numbers are not representable and yield `None`; the
/// depth cut also terminates cyclic tables.
fn lua_to_json(value: &mlua::Value, depth: usize) -> Option<Value> {
    if depth > MAX_VALUE_DEPTH {
        return None;
    }
    match value {
        mlua::Value::Nil => Some(Value::Null),
        mlua::Value::Boolean(b) => Some(Value::Bool(*b)),
        mlua::Value::Integer(i) => Some(Value::Number((*i).into())),
        mlua::Value::Number(n) => {
            if n.is_finite() {
                serde_json::Number::from_f64(*n).map(Value::Number)
            } else {
                None
            }
        }
        mlua::Value::String(s) => s.to_str().ok().map(|x| Value::String(x.to_string())),
        mlua::Value::Table(table) => {
            if table.raw_len() > 0 {
                let mut items = Vec::new();
                for item in table.sequence_values::<mlua::Value>() {
                    let item = item.ok()?;
                    if let Some(v) = lua_to_json(&item, depth + 1) {
                        items.push(v);
                    }
                }
                Some(Value::Array(items))
            } else {
                let mut map = serde_json::Map::new();
                for pair in table.pairs::<mlua::Value, mlua::Value>() {
                    let (k, v) = pair.ok()?;
                    let mlua::Value::String(key) = k else { continue };
                    let Ok(key) = key.to_str() else { continue };
                    if let Some(v) = lua_to_json(&v, depth + 1) {
                        map.insert(key.to_string(), v);
                    }
                }
                Some(Value::Object(map))
            }
        }
        _ => None,
    }
}

fn table_to_props(table: &mlua::Table) -> mlua::Result<Props> {
    let mut props = Props::new();
    for pair in table.pairs::<mlua::Value, mlua::Value>() {
        let (k, v) = pair?;
        let mlua::Value::String(key) = k else { continue };
        let Ok(key) = key.to_str() else { continue };
        if let Some(v) = lua_to_json(&v, 0) {
            props.insert(key.to_string(), v);
        }
    }
    Ok(props)
}

/// Deliver structured JSON into the Lua state.
fn json_to_lua(lua: &Lua, value: &Value) -> mlua::Result<mlua::Value> {
    Ok(match value {
        Value::Null => mlua::Value::Nil,
        Value::Bool(b) => mlua::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                mlua::Value::Integer(i)
            } else {
                mlua::Value::Number(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => mlua::Value::String(lua.create_string(s)?),
        Value::Array(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.set(i + 1, json_to_lua(lua, item)?)?;
            }
            mlua::Value::Table(table)
        }
        Value::Object(map) => {
            let table = lua.create_table()?;
            for (k, v) in map {
                table.set(k.as_str(), json_to_lua(lua, v)?)?;
            }
            mlua::Value::Table(table)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor() -> ScriptExecutor {
        ScriptExecutor::new(ExecutorConfig::default()).unwrap()
    }

    #[test]
    fn test_builder_calls_emit_operations_in_order() {
        let exec = executor();
        exec.run_program(
            r#"
            local card = ui.create("div", { class = "card" })
            ui.set_text(card, "hello")
            ui.append(ui.root(), card)
            "#,
        )
        .unwrap();
        let ops = exec.drain_operations();
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], Operation::Create { id: 1, kind, .. } if kind == "div"));
        assert!(matches!(&ops[1], Operation::SetText { id: 1, text } if text == "hello"));
        assert!(matches!(&ops[2], Operation::AppendChild { parent: 0, child: 1 }));
        // A drain is a batch boundary; the queue is now empty.
        assert!(exec.drain_operations().is_empty());
    }

    #[test]
    fn test_invoke_allocates_correlation_ids() {
        let exec = executor();
        exec.run_program(
            r#"
            local a = host.invoke("getData", { q = 1 })
            local b = host.invoke("getData", nil, function(result, err) end)
            assert(a == 1 and b == 2)
            "#,
        )
        .unwrap();
        let ops = exec.drain_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], Operation::InvokeHost { correlation_id: 1, .. }));
        assert!(matches!(&ops[1], Operation::InvokeHost { correlation_id: 2, .. }));
    }

    #[test]
    fn test_blocked_globals_raise() {
        let exec = executor();
        let err = exec.run_program("require(\"socket\")").unwrap_err();
        assert!(matches!(err, CoreError::Execution(_)));
    }

    #[test]
    fn test_uncaught_error_is_contained() {
        let exec = executor();
        let err = exec.run_program("error(\"boom\")").unwrap_err();
        match err {
            CoreError::Execution(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_oversized_program_rejected_at_load() {
        let config = ExecutorConfig {
            max_program_bytes: 16,
            ..ExecutorConfig::default()
        };
        let exec = ScriptExecutor::new(config).unwrap();
        let err = exec.run_program("print('this source is longer than sixteen bytes')");
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_runaway_program_hits_time_budget() {
        let config = ExecutorConfig {
            program_timeout_ms: 50,
            ..ExecutorConfig::default()
        };
        let exec = ScriptExecutor::new(config).unwrap();
        let err = exec.run_program("while true do end").unwrap_err();
        assert!(matches!(err, CoreError::Execution(_)));
    }

    #[test]
    fn test_memory_hogging_program_hits_heap_limit() {
        let config = ExecutorConfig {
            memory_limit_bytes: 256 * 1024,
            program_timeout_ms: 5_000,
            ..ExecutorConfig::default()
        };
        let exec = ScriptExecutor::new(config).unwrap();
        let err = exec
            .run_program(
                r#"
                local t = {}
                local i = 1
                while true do
                    t[i] = string.rep("a", 1024)
                    i = i + 1
                end
                "#,
            )
            .unwrap_err();
        match err {
            CoreError::Execution(message) => {
                assert!(
                    message.to_lowercase().contains("memory"),
                    "unexpected error text: {message}"
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_print_is_captured_not_forwarded() {
        let exec = executor();
        exec.run_program("print(\"diag\", 42, true)").unwrap();
        assert_eq!(exec.console(), "diag\t42\ttrue\n");
    }

    #[test]
    fn test_event_dispatch_resumes_stored_handler() {
        let exec = executor();
        exec.run_program(
            r#"
            local b = ui.create("button", {})
            ui.on(b, "click", function(event)
                ui.set_text(b, "clicked " .. tostring(event.count))
            end)
            "#,
        )
        .unwrap();
        exec.drain_operations();
        let handled = exec.dispatch_event(1, &json!({"count": 2})).unwrap();
        assert!(handled);
        let ops = exec.drain_operations();
        assert!(matches!(&ops[0], Operation::SetText { id: 1, text } if text == "clicked 2"));
    }

    #[test]
    fn test_stale_handler_is_silently_dropped() {
        let exec = executor();
        assert!(!exec.dispatch_event(99, &Value::Null).unwrap());
    }

    #[test]
    fn test_call_result_resumes_callback_once() {
        let exec = executor();
        exec.run_program(
            r#"
            host.invoke("getData", {}, function(result, err)
                local t = ui.create("p", {})
                ui.set_text(t, err or result.status)
            end)
            "#,
        )
        .unwrap();
        exec.drain_operations();
        exec.deliver_call_result(1, &Ok(json!({"status": "done"})))
            .unwrap();
        let ops = exec.drain_operations();
        assert!(matches!(&ops[1], Operation::SetText { text, .. } if text == "done"));
        // The callback slot is released after the first delivery.
        exec.deliver_call_result(1, &Ok(json!({"status": "again"})))
            .unwrap();
        assert!(exec.drain_operations().is_empty());
    }

    #[test]
    fn test_unrepresentable_values_are_stripped() {
        let exec = executor();
        exec.run_program(
            r#"
            ui.create("div", {
                ok = "yes",
                fn = function() end,
                inf = 1 / 0,
                nested = { keep = 1, bad = function() end },
            })
            "#,
        )
        .unwrap();
        let ops = exec.drain_operations();
        let Operation::Create { props, .. } = &ops[0] else {
            panic!("expected create");
        };
        assert_eq!(props.get("ok"), Some(&json!("yes")));
        assert!(!props.contains_key("fn"));
        assert!(!props.contains_key("inf"));
        assert_eq!(props.get("nested"), Some(&json!({"keep": 1})));
    }

    #[test]
    fn test_cyclic_table_conversion_terminates() {
        let exec = executor();
        exec.run_program(
            r#"
            local t = {}
            t.me = t
            host.invoke("getData", t)
            "#,
        )
        .unwrap();
        let ops = exec.drain_operations();
        let Operation::InvokeHost { args, .. } = &ops[0] else {
            panic!("expected invoke");
        };
        // The cycle is cut at the depth limit instead of recursing forever.
        assert!(args.is_object());
    }
}
