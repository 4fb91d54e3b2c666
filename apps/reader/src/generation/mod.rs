// Reader generation: the pipeline and the collaborators it calls.
// Story, split and illustration requests go through the collaborator traits;
// nothing in pipeline.rs talks to a model API directly.

pub mod collaborators;
pub mod debug_dump;
pub mod handlers;
pub mod local;
pub mod openai;
pub mod pipeline;
pub mod prompts;
