use std::sync::Arc;
use wastesense::InferenceContext;

pub type AppState = Arc<State>;

pub struct State {
    pub context: InferenceContext,
}

impl State {
    pub fn new(context: InferenceContext) -> Self {
        Self { context }
    }
}
