pub mod message;
pub mod recent;
pub mod responder;
pub mod selector;

pub use recent::RecentEvents;
pub use responder::{run_blame_animation, Animation, Pacing};
pub use selector::select_blamee;
