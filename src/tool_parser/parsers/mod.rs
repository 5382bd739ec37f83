/// Parser implementations for the tool call encodings the bridge understands
pub mod fenced;
pub mod helpers;
pub mod qwen_coder;

pub use fenced::FencedStreamParser;
pub use qwen_coder::QwenCoderParser;
