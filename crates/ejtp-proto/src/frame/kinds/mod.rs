//! Built-in frame kinds: JSON, encrypted, signed, and compressed.

use std::sync::Arc;

use crate::registry::FrameCodec;

pub mod compressed;
pub mod encrypted;
pub mod json;
pub mod signed;

/// The codecs registered at process start.
pub(crate) fn builtins() -> Vec<Arc<dyn FrameCodec>> {
    vec![
        Arc::new(json::JsonFrameCodec),
        Arc::new(encrypted::EncryptedFrameCodec),
        Arc::new(signed::SignedFrameCodec),
        Arc::new(compressed::CompressedFrameCodec),
    ]
}
