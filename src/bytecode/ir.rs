use crate::bytecode::Op;
use serde::{Deserialize, Serialize};

/// A compiled bytecode program.
///
/// Built once per compilation and immutable afterwards; the same program can
/// be handed to any number of independent VM runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramBc {
    /// Instruction sequence for the top-level statements.
    pub main: Vec<Op>,

    /// Compiled function bodies, indexed by the function index assigned
    /// during resolution.
    pub functions: Vec<Vec<Op>>,
}

impl ProgramBc {
    /// Serializes the whole program (main body plus function table) as a
    /// single self-contained image.
    ///
    /// This is distinct from the raw per-sequence encoding in
    /// `bytecode::encode`: the raw format is a bare instruction stream for
    /// one sequence, while the image carries the function table too.
    pub fn to_image(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a program image produced by `to_image`.
    #[allow(dead_code)]
    pub fn from_image(bytes: &[u8]) -> Result<ProgramBc, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
