/// A fatal VM error.
///
/// These signal a malformed or hand-built program: bytecode produced by this
/// compiler's own code generator never triggers them. There is no recovery;
/// execution aborts at the failing instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// An instruction popped from an empty data stack.
    StackUnderflow,

    /// A `LoadLocal` read a slot that was never stored.
    UninitializedSlot(u32),

    /// A `Call` referred to a function index outside the function table.
    UndefinedFunction(u32),

    /// The instruction pointer left the current code sequence (a branch out
    /// of range, or falling off the end without a `Return`).
    IpOutOfRange,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::StackUnderflow => {
                write!(f, "runtime error: pop from an empty data stack")
            }
            RuntimeError::UninitializedSlot(slot) => {
                write!(f, "runtime error: read of uninitialized local slot {}", slot)
            }
            RuntimeError::UndefinedFunction(index) => {
                write!(f, "runtime error: call to undefined function index {}", index)
            }
            RuntimeError::IpOutOfRange => {
                write!(f, "runtime error: instruction pointer out of range")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}
