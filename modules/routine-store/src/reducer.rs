use serde_json::Value;

/// Pure state updates. No I/O, no side effects.
///
/// Called for every plain action that reaches the store, whether it came
/// from a caller or was forwarded by a routine.
pub trait Reducer<S>: Send + Sync {
    fn reduce(&self, state: &mut S, action: &Value);
}

pub struct FnReducer<F>(F);

impl<S, F> Reducer<S> for FnReducer<F>
where
    F: Fn(&mut S, &Value) + Send + Sync,
{
    fn reduce(&self, state: &mut S, action: &Value) {
        (self.0)(state, action)
    }
}

pub fn from_fn<S, F>(f: F) -> FnReducer<F>
where
    F: Fn(&mut S, &Value) + Send + Sync,
{
    FnReducer(f)
}
