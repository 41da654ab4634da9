pub mod loop_;
pub mod system_prompt;

pub use loop_::run_cycle;
