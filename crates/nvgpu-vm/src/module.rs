//! Native module registration and dispatch contract.
//!
//! A custom module exposes a fixed, named function table plus a state
//! factory. The host runtime creates one state per execution context and
//! invokes functions on it strictly sequentially — one call in flight per
//! state at a time. Modules rely on that contract instead of locking.

use crate::status::Status;
use crate::value::Value;

/// One entry in a module's function table.
pub struct NativeFunction<S> {
    /// Function name relative to the module, e.g. `tensor.arg`.
    pub name: &'static str,
    pub call: fn(&mut S, &[Value]) -> Result<Option<Value>, Status>,
}

/// A named, versioned collection of callable operations.
pub trait NativeModule {
    /// Per-context state holding the module's live native resources.
    type State: 'static;

    fn name(&self) -> &'static str;

    fn version(&self) -> u32;

    fn functions(&self) -> &'static [NativeFunction<Self::State>];

    /// Construct a fresh state for one execution context.
    fn create_state(&self) -> Result<Self::State, Status>;

    /// Resolve `function` in the table and call it on `state`.
    fn invoke(
        &self,
        state: &mut Self::State,
        function: &str,
        args: &[Value],
    ) -> Result<Option<Value>, Status> {
        let entry = self
            .functions()
            .iter()
            .find(|f| f.name == function)
            .ok_or_else(|| {
                Status::not_found(format!(
                    "module '{}' has no function '{function}'",
                    self.name()
                ))
            })?;
        (entry.call)(state, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusCode;

    struct CounterState {
        total: i64,
    }

    struct CounterModule;

    fn add(state: &mut CounterState, args: &[Value]) -> Result<Option<Value>, Status> {
        let delta = args
            .first()
            .and_then(Value::as_i64)
            .ok_or_else(|| Status::invalid_argument("add expects an integer"))?;
        state.total += delta;
        Ok(Some(Value::I64(state.total)))
    }

    static COUNTER_FUNCTIONS: [NativeFunction<CounterState>; 1] =
        [NativeFunction { name: "add", call: add }];

    impl NativeModule for CounterModule {
        type State = CounterState;

        fn name(&self) -> &'static str {
            "counter"
        }

        fn version(&self) -> u32 {
            0
        }

        fn functions(&self) -> &'static [NativeFunction<CounterState>] {
            &COUNTER_FUNCTIONS
        }

        fn create_state(&self) -> Result<CounterState, Status> {
            Ok(CounterState { total: 0 })
        }
    }

    #[test]
    fn test_invoke_dispatches_by_name() {
        let module = CounterModule;
        let mut state = module.create_state().unwrap();
        let out = module.invoke(&mut state, "add", &[Value::I64(5)]).unwrap();
        assert!(matches!(out, Some(Value::I64(5))));
        let out = module.invoke(&mut state, "add", &[Value::I64(2)]).unwrap();
        assert!(matches!(out, Some(Value::I64(7))));
    }

    #[test]
    fn test_invoke_unknown_function() {
        let module = CounterModule;
        let mut state = module.create_state().unwrap();
        let err = module.invoke(&mut state, "sub", &[]).unwrap_err();
        assert_eq!(err.code(), StatusCode::NotFound);
    }
}
