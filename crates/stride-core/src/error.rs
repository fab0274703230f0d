use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrideError {
    #[error("Degenerate IK chain: bone lengths {upper} and {lower} must both be non-zero")]
    DegenerateBone { upper: f32, lower: f32 },

    #[error("Joint index {index} out of range for {len} joints")]
    JointOutOfRange { index: usize, len: usize },

    #[error("Joint {joint} has parent {parent}; parents must precede their children")]
    InvalidParent { joint: usize, parent: i64 },

    #[error("Joints {root}, {middle}, {end} do not form a parent-child chain")]
    NotAChain { root: usize, middle: usize, end: usize },

    #[error("Joint {0} has no parent")]
    MissingParent(usize),

    #[error("Joint count mismatch: expected {expected}, got {actual}")]
    JointCountMismatch { expected: usize, actual: usize },

    #[error("Unknown joint: {0}")]
    UnknownJoint(String),
}

pub type Result<T> = std::result::Result<T, StrideError>;
