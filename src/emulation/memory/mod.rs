//! Memory model: the managed heap, frame-local evaluation stacks and local variable slots.

mod heap;
mod locals;
mod stack;

pub use heap::{ArrayStorage, HeapObject, ManagedHeap, MAX_ARRAY_LENGTH};
pub use locals::LocalVariables;
pub use stack::EvaluationStack;
