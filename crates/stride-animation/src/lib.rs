pub mod foot_placement;
pub mod hierarchy;
pub mod ik;
pub mod pose;
pub mod pose_buffer;
pub mod skeleton;

pub use foot_placement::*;
pub use hierarchy::*;
pub use ik::*;
pub use pose::*;
pub use pose_buffer::*;
pub use skeleton::*;
