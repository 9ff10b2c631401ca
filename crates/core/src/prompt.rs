//! Generation request defaults.

/// Prompt sent with every generation request.
pub const DEFAULT_PROMPT: &str = "The two people in the image lean in and share a gentle, \
romantic kiss. Natural lighting, smooth camera, realistic motion.";

/// Ask the remote model to rewrite the prompt before generating.
pub const DEFAULT_PROMPT_OPTIMIZER: bool = true;
